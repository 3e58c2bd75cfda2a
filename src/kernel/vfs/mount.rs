use alloc::collections::btree_map::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt::Write as _;

use async_trait::async_trait;
use eonix_sync::Spin;

use super::dentry::Dentry;
use super::inode::InodeUse;
use super::{SbUse, SuperBlock};
use crate::kernel::constants::{ENODEV, ENOTDIR};
use crate::prelude::KResult;

pub const MS_RDONLY: u64 = 1 << 0;
pub const MS_NOSUID: u64 = 1 << 1;
pub const MS_NODEV: u64 = 1 << 2;
pub const MS_NOEXEC: u64 = 1 << 3;
pub const MS_NOATIME: u64 = 1 << 10;
pub const MS_RELATIME: u64 = 1 << 21;
pub const MS_STRICTATIME: u64 = 1 << 24;
pub const MS_LAZYTIME: u64 = 1 << 25;

const MOUNT_FLAGS: [(u64, &str); 6] = [
    (MS_NOSUID, ",nosuid"),
    (MS_NODEV, ",nodev"),
    (MS_NOEXEC, ",noexec"),
    (MS_NOATIME, ",noatime"),
    (MS_RELATIME, ",relatime"),
    (MS_LAZYTIME, ",lazytime"),
];

/// A filesystem driver registered under a name, able to produce a [`Mount`]
/// for a given source and mount point.
#[async_trait]
pub trait MountCreator: Send + Sync {
    async fn create_mount(&self, source: &str, flags: u64, mp: &Arc<Dentry>) -> KResult<Mount>;

    /// Sniff `sig` (typically the device's first block) to see whether this
    /// driver recognizes the on-disk format.
    fn check_signature(&self, sig: &[u8]) -> KResult<bool>;
}

static MOUNT_CREATORS: Spin<BTreeMap<String, Arc<dyn MountCreator>>> = Spin::new(BTreeMap::new());

pub fn register_filesystem(fstype: &str, creator: Arc<dyn MountCreator>) -> KResult<()> {
    MOUNT_CREATORS.lock().insert(String::from(fstype), creator);
    Ok(())
}

fn get_creator(fstype: &str) -> KResult<Arc<dyn MountCreator>> {
    MOUNT_CREATORS.lock().get(fstype).cloned().ok_or(ENODEV)
}

/// A filesystem attached to a mount point, keeping the backing superblock
/// alive for as long as the mount lives.
pub struct Mount {
    #[allow(dead_code)]
    sb: SbUse<dyn SuperBlock>,
    extra_opts: String,
}

impl Mount {
    /// Attach `root_inode` to `mp`, turning it into the root of `fs`.
    pub fn new<S>(mp: &Arc<Dentry>, fs: SbUse<S>, root_inode: InodeUse) -> KResult<Mount>
    where
        S: SuperBlock,
    {
        mp.fill(root_inode);

        Ok(Mount {
            sb: fs,
            extra_opts: String::new(),
        })
    }

    /// Append filesystem-specific text to this mount's `/proc/mounts` options field.
    pub fn with_extra_opts(mut self, opts: String) -> Self {
        self.extra_opts = opts;
        self
    }
}

struct MountPointData {
    #[allow(dead_code)]
    mount: Mount,
    source: String,
    mountpoint: String,
    fstype: String,
    flags: u64,
}

static MOUNTS: Spin<BTreeMap<usize, MountPointData>> = Spin::new(BTreeMap::new());

fn mount_key(mountpoint: &Arc<Dentry>) -> usize {
    Arc::as_ptr(mountpoint) as usize
}

/// Mount `fstype` from `source` onto `mountpoint`, which must already exist
/// as an empty directory.
pub async fn do_mount(
    mountpoint: &Arc<Dentry>,
    source: &str,
    mountpoint_str: &str,
    fstype: &str,
    flags: u64,
) -> KResult<()> {
    if !mountpoint.is_directory() {
        return Err(ENOTDIR);
    }

    let mut flags = flags;
    if flags & MS_NOATIME == 0 {
        flags |= MS_RELATIME;
    }

    if flags & MS_STRICTATIME != 0 {
        flags &= !(MS_RELATIME | MS_NOATIME);
    }

    let creator = get_creator(fstype)?;
    let mount = creator.create_mount(source, flags, mountpoint).await?;

    let mpdata = MountPointData {
        mount,
        source: String::from(source),
        mountpoint: String::from(mountpoint_str),
        fstype: String::from(fstype),
        flags,
    };

    MOUNTS.lock().insert(mount_key(mountpoint), mpdata);

    Ok(())
}

fn mount_opts(flags: u64) -> String {
    let mut out = String::new();
    if flags & MS_RDONLY != 0 {
        out += "ro";
    } else {
        out += "rw";
    }

    for (flag, name) in MOUNT_FLAGS {
        if flags & flag != 0 {
            out += name;
        }
    }

    out
}

pub fn dump_mounts(buffer: &mut dyn core::fmt::Write) {
    for mpdata in MOUNTS.lock().values() {
        let mut opts = mount_opts(mpdata.flags);
        if !mpdata.mount.extra_opts.is_empty() {
            opts += ",";
            opts += &mpdata.mount.extra_opts;
        }

        let _ = writeln!(
            buffer,
            "{} {} {} {} 0 0",
            mpdata.source, mpdata.mountpoint, mpdata.fstype, opts
        );
    }
}

/// Mount the in-memory root filesystem onto [`Dentry::root`].
///
/// Must run once, before [`super::FsContext::global`] is first accessed.
pub async fn create_rootfs() {
    let root = Dentry::root().clone();
    let source = String::from("none");
    let fstype = String::from("tmpfs");
    let flags = MS_NOATIME;

    let creator = get_creator(&fstype).unwrap();
    let mount = creator.create_mount(&source, flags, &root).await.unwrap();

    let mpdata = MountPointData {
        mount,
        source,
        mountpoint: String::from("/"),
        fstype,
        flags,
    };

    MOUNTS.lock().insert(mount_key(&root), mpdata);
}
