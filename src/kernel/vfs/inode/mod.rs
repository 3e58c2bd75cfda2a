mod ino;
mod inode;
mod ops;
mod statx;

pub use ino::{AtomicIno, Ino};
pub use inode::{Inode, InodeInfo, InodeOps, InodeUse};
pub use ops::{RenameData, WriteOffset};
