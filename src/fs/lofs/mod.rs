//! Stackable loopback filesystem: a thin overlay superblock that pairs every
//! dentry with a dentry in some other, already-mounted namespace (the
//! "lower" filesystem) and forwards every operation to it, mirroring
//! attributes back onto the overlay inode as it goes.

mod automount;
mod inode;

use alloc::format;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use eonix_log::{println_debug, println_warn};

use crate::kernel::constants::EINVAL;
use crate::kernel::vfs::dentry::Dentry;
use crate::kernel::vfs::mount::{register_filesystem, Mount, MountCreator, MS_RDONLY};
use crate::kernel::vfs::{SbRef, SbUse, SuperBlock, SuperBlockInfo};
use crate::prelude::KResult;

use inode::LoInode;

/// `ioctl` request number for `PRUNE`: shrink the overlay's cached dentry
/// subtree rooted at the inode the request was issued against, dropping
/// every negative entry. Encoded as a bare `(group << 8) | command` value,
/// matching this kernel's other hand-rolled ioctl numbers (see `TCGETS` and
/// friends in `kernel::constants`) rather than POSIX's `_IOC` bit-packing,
/// which nothing here implements.
pub const LOFS_IOC_PRUNE: usize = (0x15 << 8) | 0x07;

static VERBOSITY: AtomicU32 = AtomicU32::new(0);

/// Set the module-wide logging verbosity (mirrors the original module's
/// `verbosity` load-time parameter; there is no module-parameter mechanism
/// in this kernel, so it's just a global set by `init` callers before mount
/// time).
#[allow(dead_code)]
pub fn set_verbosity(level: u32) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

fn verbosity() -> u32 {
    VERBOSITY.load(Ordering::Relaxed)
}

pub struct LoFs {
    /// Keeps the lower root pinned for the mount's lifetime, independent of
    /// any single `LoInode` instance.
    lower_root: Arc<Dentry>,
}

impl SuperBlock for LoFs {}

struct LoFsMountCreator;

#[async_trait]
impl MountCreator for LoFsMountCreator {
    async fn create_mount(&self, source: &str, flags: u64, mp: &Arc<Dentry>) -> KResult<Mount> {
        let path = if source.is_empty() { "/" } else { source };

        let lower_root = match automount::resolve(path.as_bytes()).await {
            Ok(dentry) => dentry,
            Err(err) => {
                println_warn!("lofs: failed to resolve lower root {path:?}: {err}");
                return Err(err);
            }
        };
        let lower_inode = lower_root.get_inode()?;
        let lower_sb = lower_inode.sbget()?;

        if lower_sb.is::<LoFs>() {
            return Err(EINVAL);
        }

        let sb = SbUse::new(
            SuperBlockInfo {
                io_blksize: lower_sb.info.io_blksize,
                device_id: lower_sb.info.device_id,
                read_only: flags & MS_RDONLY != 0,
            },
            LoFs {
                lower_root: lower_root.clone(),
            },
        );

        let root_inode = LoInode::new(SbRef::from(&sb), lower_root)?;

        if verbosity() >= 1 {
            println_debug!("lofs: mounted dir={path}");
        }

        Ok(Mount::new(mp, sb, root_inode)?.with_extra_opts(format!(
            "dir={path},debug={}",
            verbosity()
        )))
    }

    fn check_signature(&self, _sig: &[u8]) -> KResult<bool> {
        Ok(true)
    }
}

pub fn init() {
    automount::start();
    register_filesystem("lofs", Arc::new(LoFsMountCreator)).unwrap();
}
