#![no_std]

mod mutex;
mod rwlock;
mod spin_irq;
mod wait_list;

pub use mutex::{Mutex, MutexGuard};
pub use rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use spin_irq::SpinIrq;
pub use wait_list::{WaitHandle, WaitList};
