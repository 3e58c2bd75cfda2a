use alloc::sync::Arc;

use eonix_log::println_debug;
use eonix_sync::Mutex;

use super::LoFs;
use crate::io::{Buffer, Stream};
use crate::kernel::constants::{EINVAL, ENOTTY, EXDEV};
use crate::kernel::vfs::dentry::{dcache, Dentry};
use crate::kernel::vfs::inode::{InodeInfo, InodeOps, InodeUse, RenameData, WriteOffset};
use crate::kernel::vfs::types::{DeviceId, Format, Mode, Permission};
use crate::kernel::vfs::{SbRef, SbUse};
use crate::prelude::KResult;

use super::LOFS_IOC_PRUNE;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Tracks the access mode the overlay has so far needed against a lower
/// inode. Models the "persistent lower file" from a stacking filesystem's
/// perspective without an actual extra open handle — this kernel's dentry
/// I/O is positional, so there is no shared lower cursor to protect, only
/// the upgrade-never-downgrade policy to enforce.
struct PersistentFile {
    mode: Mutex<Option<AccessMode>>,
}

impl PersistentFile {
    fn new() -> Self {
        Self { mode: Mutex::new(None) }
    }

    async fn ensure(&self, requested: AccessMode) {
        let mut mode = self.mode.lock().await;
        match *mode {
            Some(current) if current >= requested => {}
            _ => *mode = Some(requested),
        }
    }
}

/// Overlay inode: pairs with a positive lower dentry and mirrors its
/// attributes. One `LoInode` per overlay inode, for every format (REG, DIR,
/// LNK) — directory and file operations both simply forward to `lower`.
pub struct LoInode {
    lower: Arc<Dentry>,
    persistent: PersistentFile,
}

fn mirror_attrs(inode: &InodeUse, lower_info: &InodeInfo) {
    *inode.info.lock() = lower_info.clone();
}

impl LoInode {
    /// Build an overlay inode pairing the (positive) lower dentry.
    pub fn new(sb: SbRef<LoFs>, lower: Arc<Dentry>) -> KResult<InodeUse> {
        let lower_inode = lower.get_inode()?;
        let info = lower_inode.info.lock().clone();

        Ok(InodeUse::new(
            sb,
            lower_inode.ino,
            lower_inode.format,
            info,
            Self {
                lower,
                persistent: PersistentFile::new(),
            },
        ))
    }

    async fn refresh(&self, inode: &InodeUse) -> KResult<()> {
        let lower_inode = self.lower.get_inode()?;
        mirror_attrs(inode, &lower_inode.info.lock());
        Ok(())
    }

    async fn child_inode(&self, sb: &SbUse<LoFs>, name: &[u8]) -> KResult<Option<InodeUse>> {
        let lower_child = self.lower.find_full(name).await?;
        if !lower_child.is_valid() {
            return Ok(None);
        }

        Ok(Some(LoInode::new(sb.get_ref(), lower_child)?))
    }
}

impl InodeOps for LoInode {
    type SuperBlock = LoFs;

    async fn lookup(
        &self,
        sb: SbUse<Self::SuperBlock>,
        _inode: &InodeUse,
        dentry: &Arc<Dentry>,
    ) -> KResult<Option<InodeUse>> {
        self.child_inode(&sb, dentry.name()).await
    }

    async fn readdir(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        offset: usize,
        for_each_entry: &mut (dyn (for<'a> FnMut(&'a [u8], crate::kernel::vfs::inode::Ino) -> KResult<bool>) + Send),
    ) -> KResult<KResult<usize>> {
        self.persistent.ensure(AccessMode::ReadOnly).await;
        let result = self.lower.readdir(offset, for_each_entry).await;
        self.refresh(inode).await?;
        result
    }

    async fn create(
        &self,
        sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        at: &Arc<Dentry>,
        mode: Permission,
    ) -> KResult<()> {
        self.persistent.ensure(AccessMode::ReadWrite).await;

        let lower_child = self.lower.find_full(at.name()).await?;
        lower_child.create(mode).await?;

        let overlay_child = LoInode::new(sb.get_ref(), lower_child)?;
        at.fill(overlay_child);
        self.refresh(inode).await
    }

    async fn mkdir(
        &self,
        sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        at: &Dentry,
        mode: Permission,
    ) -> KResult<()> {
        self.persistent.ensure(AccessMode::ReadWrite).await;

        let lower_child = self.lower.find_full(at.name()).await?;
        lower_child.mkdir(mode).await?;

        let overlay_child = LoInode::new(sb.get_ref(), lower_child)?;
        at.fill(overlay_child);
        self.refresh(inode).await
    }

    async fn mknod(
        &self,
        sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        at: &Dentry,
        mode: Mode,
        dev: DeviceId,
    ) -> KResult<()> {
        self.persistent.ensure(AccessMode::ReadWrite).await;

        let lower_child = self.lower.find_full(at.name()).await?;
        lower_child.mknod(mode, dev).await?;

        let overlay_child = LoInode::new(sb.get_ref(), lower_child)?;
        at.fill(overlay_child);
        self.refresh(inode).await
    }

    async fn symlink(
        &self,
        sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        at: &Arc<Dentry>,
        target: &[u8],
    ) -> KResult<()> {
        self.persistent.ensure(AccessMode::ReadWrite).await;

        let lower_child = self.lower.find_full(at.name()).await?;
        lower_child.symlink(target).await?;

        let overlay_child = LoInode::new(sb.get_ref(), lower_child)?;
        at.fill(overlay_child);
        self.refresh(inode).await
    }

    async fn unlink(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        at: &Arc<Dentry>,
    ) -> KResult<()> {
        self.persistent.ensure(AccessMode::ReadWrite).await;

        let lower_child = self.lower.find_full(at.name()).await?;
        lower_child.unlink().await?;

        dcache::d_remove(at);
        self.refresh(inode).await
    }

    async fn rename(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        rename_data: RenameData<'_, '_>,
    ) -> KResult<()> {
        self.persistent.ensure(AccessMode::ReadWrite).await;

        let RenameData {
            old_dentry,
            new_dentry,
            new_parent,
            is_exchange,
            no_replace,
        } = rename_data;

        let old_lower = self.lower.find_full(old_dentry.name()).await?;

        let new_parent_priv = new_parent.get_priv::<LoInode>();
        let new_lower_parent = &new_parent_priv.lower;
        let new_lower = new_lower_parent.find_full(new_dentry.name()).await?;

        let old_sb = old_lower.get_inode()?.sbref();
        let new_sb = new_lower.parent().get_inode()?.sbref();
        if !old_sb.eq(&new_sb) {
            return Err(EXDEV);
        }

        Dentry::rename(&old_lower, &new_lower, is_exchange, no_replace).await?;

        self.refresh(inode).await?;
        new_parent_priv.refresh(&new_parent).await?;
        dcache::d_exchange(old_dentry, new_dentry).await;

        Ok(())
    }

    async fn read(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        buffer: &mut dyn Buffer,
        offset: usize,
    ) -> KResult<usize> {
        self.persistent.ensure(AccessMode::ReadOnly).await;
        let nread = self.lower.read(buffer, offset).await?;
        self.refresh(inode).await?;
        Ok(nread)
    }

    async fn read_direct(
        &self,
        sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        buffer: &mut dyn Buffer,
        offset: usize,
    ) -> KResult<usize> {
        self.read(sb, inode, buffer, offset).await
    }

    async fn write(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        stream: &mut dyn Stream,
        offset: WriteOffset<'_>,
    ) -> KResult<usize> {
        self.persistent.ensure(AccessMode::ReadWrite).await;
        let nwrote = self.lower.write(stream, offset).await?;
        self.refresh(inode).await?;
        Ok(nwrote)
    }

    async fn write_direct(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        stream: &mut dyn Stream,
        offset: usize,
    ) -> KResult<usize> {
        self.persistent.ensure(AccessMode::ReadWrite).await;
        let nwrote = self.lower.write(stream, WriteOffset::Position(offset)).await?;
        self.refresh(inode).await?;
        Ok(nwrote)
    }

    async fn readlink(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        _inode: &InodeUse,
        buffer: &mut dyn Buffer,
    ) -> KResult<usize> {
        self.persistent.ensure(AccessMode::ReadOnly).await;
        self.lower.readlink(buffer).await
    }

    async fn truncate(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        length: usize,
    ) -> KResult<()> {
        self.persistent.ensure(AccessMode::ReadWrite).await;
        self.lower.truncate(length).await?;
        self.refresh(inode).await
    }

    async fn chmod(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        perm: Permission,
    ) -> KResult<()> {
        self.persistent.ensure(AccessMode::ReadWrite).await;
        self.lower.get_inode()?.chmod(perm).await?;
        self.refresh(inode).await
    }

    async fn chown(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        inode: &InodeUse,
        uid: u32,
        gid: u32,
    ) -> KResult<()> {
        self.persistent.ensure(AccessMode::ReadWrite).await;
        self.lower.get_inode()?.chown(uid, gid).await?;
        self.refresh(inode).await
    }

    fn devid(&self, _sb: SbUse<Self::SuperBlock>, _inode: &InodeUse) -> KResult<DeviceId> {
        match self.lower.inode() {
            Some(lower_inode) if matches!(lower_inode.format, Format::BLK | Format::CHR) => {
                lower_inode.devid()
            }
            _ => Err(EINVAL),
        }
    }

    fn ioctl(
        &self,
        _sb: SbUse<Self::SuperBlock>,
        _inode: &InodeUse,
        request: usize,
        arg: usize,
    ) -> KResult<usize> {
        if request == LOFS_IOC_PRUNE {
            let pruned = dcache::prune_negative_under(&self.lower);
            if super::verbosity() >= 1 {
                println_debug!("lofs: pruned {pruned} negative dentries");
            }
            return Ok(0);
        }

        self.lower.get_inode().map_or(Err(ENOTTY), |inode| inode.ioctl(request, arg))
    }
}
