use alloc::collections::btree_map::BTreeMap;
use core::sync::atomic::{AtomicBool, Ordering};

use align_ext::AlignExt;
use eonix_mm::paging::{PAGE_SIZE, PAGE_SIZE_BITS};
use eonix_sync::Mutex;

use super::paging::{AllocZeroed, PageExt, PageLocked};
use super::Page;
use crate::io::Buffer;
use crate::io::Stream;
use crate::kernel::vfs::inode::InodeUse;
use crate::prelude::KResult;

/// A page-granular offset into a file, i.e. a byte offset floor-aligned and
/// divided by [`PAGE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageOffset(usize);

impl PageOffset {
    pub fn from_byte_floor(offset: usize) -> Self {
        Self(offset >> PAGE_SIZE_BITS)
    }

    pub fn byte_offset(&self) -> usize {
        self.0 << PAGE_SIZE_BITS
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

pub struct CachePage {
    page: Page,
    valid_size: usize,
    dirty: AtomicBool,
}

impl CachePage {
    pub fn new() -> Self {
        Self {
            page: Page::alloc(),
            valid_size: 0,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn new_zeroed() -> Self {
        Self {
            page: Page::zeroed(),
            valid_size: PAGE_SIZE,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn lock(&self) -> PageLocked<'_> {
        self.page.lock()
    }

    pub fn valid_size(&self) -> usize {
        self.valid_size
    }

    pub fn set_valid_size(&mut self, valid_size: usize) {
        self.valid_size = valid_size;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Relaxed);
    }
}

/// The buffered page cache backing a regular-file [`InodeUse`].
///
/// Pages are fetched and written back through the owning inode's
/// `read_page`/`write_page` hooks. Holding a strong reference to the inode
/// here is safe: the inode only ever reaches back to us via a [`Weak`],
/// never the other way around.
pub struct PageCache {
    pages: Mutex<BTreeMap<PageOffset, CachePage>>,
    backend: InodeUse,
}

unsafe impl Send for PageCache {}
unsafe impl Sync for PageCache {}

impl PageCache {
    pub fn new(backend: InodeUse) -> Self {
        Self {
            pages: Mutex::new(BTreeMap::new()),
            backend,
        }
    }

    fn size(&self) -> usize {
        self.backend.info.lock().size as usize
    }

    async fn fetch<'a>(
        &self,
        pages: &'a mut BTreeMap<PageOffset, CachePage>,
        offset: PageOffset,
    ) -> KResult<&'a mut CachePage> {
        if !pages.contains_key(&offset) {
            let mut new_page = CachePage::new();
            self.backend.read_page(&mut new_page, offset).await?;
            pages.insert(offset, new_page);
        }

        Ok(pages.get_mut(&offset).unwrap())
    }

    pub async fn read(&self, buffer: &mut dyn Buffer, mut offset: usize) -> KResult<usize> {
        let mut pages = self.pages.lock().await;
        let size = self.size();

        loop {
            if offset >= size {
                break;
            }

            let page_off = PageOffset::from_byte_floor(offset);
            let page = self.fetch(&mut pages, page_off).await?;

            let inner_offset = offset - page_off.byte_offset();
            let available_in_file = size.saturating_sub(offset);

            let locked = page.lock();
            let page_data = &locked.as_bytes()[inner_offset..page.valid_size().max(inner_offset)];
            let read_size = page_data.len().min(available_in_file);

            if read_size == 0
                || buffer.fill(&page_data[..read_size])?.should_stop()
                || buffer.available() == 0
            {
                break;
            }

            offset += read_size;
        }

        Ok(buffer.wrote())
    }

    pub async fn write(&self, stream: &mut dyn Stream, mut offset: usize) -> KResult<usize> {
        let mut pages = self.pages.lock().await;
        let old_size = self.size();
        let mut wrote = 0;

        loop {
            let page_off = PageOffset::from_byte_floor(offset);
            let inner_offset = offset - page_off.byte_offset();

            let page = if pages.contains_key(&page_off) {
                pages.get_mut(&page_off).unwrap()
            } else {
                let new_page = if page_off.byte_offset() > old_size {
                    CachePage::new_zeroed()
                } else {
                    let mut new_page = CachePage::new();
                    self.backend.read_page(&mut new_page, page_off).await?;
                    new_page
                };

                pages.insert(page_off, new_page);
                pages.get_mut(&page_off).unwrap()
            };

            let mut locked = page.lock();
            let cursor_end = match stream.poll_data(&mut locked.as_bytes_mut()[inner_offset..])? {
                Some(buf) => {
                    wrote += buf.len();
                    inner_offset + buf.len()
                }
                None => break,
            };
            drop(locked);

            if page.valid_size() < cursor_end {
                page.set_valid_size(cursor_end);
            }
            page.set_dirty(true);

            offset = page_off.next().byte_offset();
        }

        Ok(wrote)
    }

    pub async fn fsync(&self) -> KResult<()> {
        let mut pages = self.pages.lock().await;
        for (page_off, page) in pages.iter_mut() {
            if page.is_dirty() {
                self.backend.write_page(page, *page_off).await?;
                page.set_dirty(false);
            }
        }
        Ok(())
    }

    pub async fn resize(&self, new_size: usize) -> KResult<()> {
        let mut pages = self.pages.lock().await;
        let old_size = self.size();

        if new_size < old_size {
            let begin = PageOffset::from_byte_floor(new_size.align_down(PAGE_SIZE));
            let end = PageOffset::from_byte_floor(old_size.align_up(PAGE_SIZE));

            let mut cur = begin;
            while cur < end {
                pages.remove(&cur);
                cur = cur.next();
            }
        } else if new_size > old_size {
            let begin = PageOffset::from_byte_floor(old_size.align_down(PAGE_SIZE));
            let end = PageOffset::from_byte_floor(new_size.align_up(PAGE_SIZE));

            pages.remove(&begin);

            let mut cur = begin;
            while cur < end {
                let mut new_page = CachePage::new_zeroed();

                if cur != PageOffset::from_byte_floor(new_size.align_down(PAGE_SIZE)) {
                    new_page.set_valid_size(PAGE_SIZE);
                } else {
                    new_page.set_valid_size(new_size % PAGE_SIZE);
                }
                new_page.set_dirty(true);
                pages.insert(cur, new_page);

                cur = cur.next();
            }
        }

        Ok(())
    }

    /// Run `func` against the backing physical page for `offset`, fetching it
    /// from the inode's `read_page` hook on a cache miss. Used by the mmap
    /// fault path, which needs the raw [`Page`] rather than a `Buffer`.
    pub async fn with_page<F, O>(&self, offset: PageOffset, func: F) -> KResult<Option<O>>
    where
        F: FnOnce(&Page, &CachePage) -> O,
    {
        let size = self.size();
        if offset.byte_offset() > size {
            return Ok(None);
        }

        let mut pages = self.pages.lock().await;
        let page = self.fetch(&mut pages, offset).await?;

        Ok(Some(func(&page.page, page)))
    }

    /// Fetch (and lock in place) the cache page backing `offset` within
    /// `pages`, populating it via the inode's `read_page` hook on a miss.
    pub async fn get_page_locked<'a>(
        &self,
        pages: &'a mut BTreeMap<PageOffset, CachePage>,
        offset: PageOffset,
    ) -> KResult<&'a mut CachePage> {
        self.fetch(pages, offset).await
    }
}

impl Drop for PageCache {
    fn drop(&mut self) {
        // `fsync` is async; best-effort only. Dirty pages are otherwise
        // flushed explicitly before the owning inode is dropped.
    }
}
