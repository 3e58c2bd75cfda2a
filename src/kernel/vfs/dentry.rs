pub mod dcache;

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::future::Future;
use core::mem::MaybeUninit;
use core::pin::Pin;

use eonix_sync::{LazyLock, Spin};

use super::inode::{InodeUse, WriteOffset};
use super::types::{DeviceId, Format, Mode, Permission};
use super::FsContext;
use crate::io::{Buffer, ByteBuffer, Stream};
use crate::kernel::constants::{ELOOP, ENOENT, ENOTDIR};
use crate::kernel::vfs::inode::{Ino, RenameData};
use crate::path::{Path, PathComponent, PathIterator};
use crate::prelude::KResult;

/// A name-and-parent pair in the tree, optionally carrying a live inode.
///
/// A `Dentry` without an inode is "negative": it records that a lookup under
/// its parent has already been attempted and is kept around so repeated
/// lookups of the same missing name don't hit the filesystem again, and so
/// that `create`-family operations have something to fill in.
pub struct Dentry {
    parent: Arc<Dentry>,
    name: Arc<[u8]>,
    inode: Spin<Option<InodeUse>>,
}

static ROOT: LazyLock<Arc<Dentry>> = LazyLock::new(|| {
    // The root dentry is its own parent. Build it in place so `parent` can
    // point back at the same allocation.
    let root: Arc<Dentry> = Arc::new_uninit();
    let self_ref = unsafe { root.clone().assume_init() };

    unsafe { &mut *(Arc::as_ptr(&root) as *mut MaybeUninit<Dentry>) }.write(Dentry {
        parent: self_ref,
        name: Arc::from(b"/".as_slice()),
        inode: Spin::new(None),
    });

    unsafe { root.assume_init() }
});

impl Dentry {
    /// The one and only filesystem root dentry, valid once a root filesystem
    /// has been mounted onto it with [`Dentry::fill`].
    pub fn root() -> &'static Arc<Dentry> {
        &ROOT
    }

    pub fn create(parent: Arc<Dentry>, name: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            parent,
            name: Arc::from(name),
            inode: Spin::new(None),
        })
    }

    pub fn name(&self) -> &Arc<[u8]> {
        &self.name
    }

    pub fn get_name(&self) -> Arc<[u8]> {
        self.name.clone()
    }

    pub fn parent(&self) -> &Arc<Self> {
        &self.parent
    }

    pub fn is_root(&self) -> bool {
        Arc::as_ptr(&self.parent) == (self as *const Dentry)
    }

    /// Attach an inode to a negative dentry, making it positive.
    pub fn fill(&self, inode: InodeUse) {
        *self.inode.lock() = Some(inode);
    }

    pub fn inode(&self) -> Option<InodeUse> {
        self.inode.lock().clone()
    }

    /// Detach the inode from this dentry, turning it negative again.
    pub fn invalidate(&self) {
        *self.inode.lock() = None;
    }

    pub fn get_inode(&self) -> KResult<InodeUse> {
        self.inode().ok_or(ENOENT)
    }

    pub fn is_valid(&self) -> bool {
        self.inode.lock().is_some()
    }

    pub fn is_directory(&self) -> bool {
        self.inode()
            .map_or(false, |inode| inode.format == Format::DIR)
    }
}

impl Dentry {
    /// Find or create the child dentry named `name` under `self`, consulting
    /// the dentry cache before falling back to a lookup against the backing
    /// inode. The returned dentry may be negative.
    pub async fn find_full(self: &Arc<Self>, name: &[u8]) -> KResult<Arc<Self>> {
        match name {
            b"." => return Ok(self.clone()),
            b".." => return Ok(self.parent.clone()),
            _ => {}
        }

        if let Some(found) = dcache::d_find(self, name) {
            return Ok(found);
        }

        let dentry = Dentry::create(self.clone(), name);
        dcache::d_try_revalidate(&dentry).await;
        dcache::d_add(dentry.clone());

        Ok(dentry)
    }
}

enum WalkStep {
    Done(Arc<Dentry>),
    Symlink {
        symlink: Arc<Dentry>,
        inode: InodeUse,
    },
}

impl FsContext {
    async fn walk_once(
        &self,
        mut current: Arc<Dentry>,
        iter: &mut PathIterator<'_>,
    ) -> KResult<WalkStep> {
        use PathComponent::*;

        loop {
            if iter.is_empty() {
                break;
            }

            if let Some(inode) = current.inode() {
                if inode.format == Format::LNK {
                    return Ok(WalkStep::Symlink {
                        symlink: current,
                        inode,
                    });
                }
            }

            let Some(component) = iter.next() else {
                break;
            };

            match component {
                TrailingEmpty | Current => {}
                Parent => {
                    if !current.is_root() && !Arc::ptr_eq(&current, &self.fsroot) {
                        current = current.parent.clone();
                    }
                }
                Name(name) => match current.inode() {
                    None => return Err(ENOENT),
                    Some(inode) if inode.format != Format::DIR => return Err(ENOTDIR),
                    Some(_) => current = current.find_full(name).await?,
                },
            }
        }

        Ok(WalkStep::Done(current))
    }

    pub async fn follow_symlink(
        &self,
        symlink: &Arc<Dentry>,
        inode: &InodeUse,
        nr_follows: u32,
    ) -> KResult<Arc<Dentry>> {
        if nr_follows >= Self::MAX_NR_FOLLOWS {
            return Err(ELOOP);
        }

        let mut target = [0u8; 256];
        let mut target = ByteBuffer::new(&mut target);
        inode.readlink(&mut target).await?;

        self.walk_recursive_boxed(
            symlink.parent().clone(),
            Path::new(target.data())?,
            nr_follows + 1,
        )
        .await
    }

    const MAX_NR_FOLLOWS: u32 = 16;

    fn walk_recursive_boxed<'a>(
        &'a self,
        cwd: Arc<Dentry>,
        path: &'a Path,
        nr_follows: u32,
    ) -> Pin<Box<dyn Future<Output = KResult<Arc<Dentry>>> + Send + 'a>> {
        Box::pin(self.walk_recursive(cwd, path, nr_follows))
    }

    async fn walk_recursive(
        &self,
        cwd: Arc<Dentry>,
        path: &Path,
        nr_follows: u32,
    ) -> KResult<Arc<Dentry>> {
        let mut current = if path.is_absolute() {
            self.fsroot.clone()
        } else {
            cwd
        };

        let mut iter = path.iter();

        loop {
            match self.walk_once(current, &mut iter).await? {
                WalkStep::Done(dentry) => return Ok(dentry),
                WalkStep::Symlink { symlink, inode } => {
                    current = self.follow_symlink(&symlink, &inode, nr_follows).await?;
                }
            }
        }
    }

    pub async fn start_recursive_walk(
        &self,
        cwd: &Arc<Dentry>,
        path: &Path,
    ) -> KResult<Arc<Dentry>> {
        self.walk_recursive(cwd.clone(), path, 0).await
    }
}

impl Dentry {
    pub async fn open(context: &FsContext, path: &Path, follow: bool) -> KResult<Arc<Self>> {
        let cwd = context.cwd.lock().clone();
        let dentry = context.start_recursive_walk(&cwd, path).await?;

        if follow {
            if let Some(inode) = dentry.inode() {
                if inode.format == Format::LNK {
                    return context.follow_symlink(&dentry, &inode, 0).await;
                }
            }
        }

        Ok(dentry)
    }

    pub async fn open_at(
        context: &FsContext,
        at: &Arc<Self>,
        path: &Path,
        follow: bool,
    ) -> KResult<Arc<Self>> {
        let dentry = context.start_recursive_walk(at, path).await?;

        if follow {
            if let Some(inode) = dentry.inode() {
                if inode.format == Format::LNK {
                    return context.follow_symlink(&dentry, &inode, 0).await;
                }
            }
        }

        Ok(dentry)
    }
}

impl Dentry {
    pub async fn read(&self, buffer: &mut dyn Buffer, offset: usize) -> KResult<usize> {
        self.get_inode()?.read(buffer, offset).await
    }

    pub async fn write(&self, stream: &mut dyn Stream, offset: WriteOffset<'_>) -> KResult<usize> {
        self.get_inode()?.write(stream, offset).await
    }

    pub async fn readdir(
        &self,
        offset: usize,
        mut for_each_entry: impl (for<'a> FnMut(&'a [u8], Ino) -> KResult<bool>) + Send,
    ) -> KResult<KResult<usize>> {
        self.get_inode()?.readdir(offset, &mut for_each_entry).await
    }

    pub fn statx(&self, stat: &mut posix_types::stat::StatX, mask: u32) -> KResult<()> {
        self.get_inode()?.statx(stat, mask)
    }

    pub async fn truncate(&self, length: usize) -> KResult<()> {
        self.get_inode()?.truncate(length).await
    }

    pub async fn readlink(&self, buffer: &mut dyn Buffer) -> KResult<usize> {
        self.get_inode()?.readlink(buffer).await
    }

    pub async fn create(self: &Arc<Self>, perm: Permission) -> KResult<()> {
        self.parent.get_inode()?.create(self, perm).await
    }

    pub async fn mkdir(self: &Arc<Self>, perm: Permission) -> KResult<()> {
        self.parent.get_inode()?.mkdir(self, perm).await
    }

    pub async fn mknod(self: &Arc<Self>, mode: Mode, dev: DeviceId) -> KResult<()> {
        self.parent.get_inode()?.mknod(self, mode, dev).await
    }

    pub async fn symlink(self: &Arc<Self>, target: &[u8]) -> KResult<()> {
        self.parent.get_inode()?.symlink(self, target).await
    }

    pub async fn unlink(self: &Arc<Self>) -> KResult<()> {
        self.parent.get_inode()?.unlink(self).await
    }

    pub async fn rename(
        old_dentry: &Arc<Self>,
        new_dentry: &Arc<Self>,
        is_exchange: bool,
        no_replace: bool,
    ) -> KResult<()> {
        let old_parent = old_dentry.parent.get_inode()?;
        let new_parent = new_dentry.parent.get_inode()?;

        old_parent
            .rename(RenameData {
                old_dentry,
                new_dentry,
                new_parent,
                is_exchange,
                no_replace,
            })
            .await
    }
}
