use crate::kernel::constants::EFAULT;
use crate::prelude::*;

use core::{ffi::c_char, fmt::Write, mem::MaybeUninit, pin::Pin};

pub enum FillResult {
    Done(usize),
    Partial(usize),
    Full,
}

impl FillResult {
    pub fn ok_or(self, err: u32) -> KResult<()> {
        match self {
            FillResult::Done(_) => Ok(()),
            _ => Err(err),
        }
    }

    pub fn allow_partial(self) -> usize {
        match self {
            FillResult::Done(n) | FillResult::Partial(n) => n,
            FillResult::Full => 0,
        }
    }
}

pub trait Buffer {
    fn total(&self) -> usize;
    fn fill(&mut self, data: &[u8]) -> KResult<FillResult>;

    /// Number of bytes written into this buffer so far.
    fn wrote(&self) -> usize;

    /// Remaining capacity.
    fn available(&self) -> usize {
        self.total() - self.wrote()
    }
}

/// Fill a buffer with a POD value's raw bytes.
pub trait BufferFill: Buffer {
    fn copy<T: Copy + Sized>(&mut self, data: &T) -> KResult<FillResult> {
        let bytes = unsafe {
            core::slice::from_raw_parts(data as *const T as *const u8, core::mem::size_of::<T>())
        };
        self.fill(bytes)
    }
}

impl<T: Buffer + ?Sized> BufferFill for T {}

pub struct UninitBuffer<'lt, T: Copy + Sized> {
    data: Box<MaybeUninit<T>>,
    buffer: RawBuffer<'lt>,
}

impl<'lt, T: Copy + Sized> UninitBuffer<'lt, T> {
    pub fn new() -> Self {
        let mut data = Box::new(MaybeUninit::uninit());
        let ptr = data.as_mut_ptr();

        Self {
            data,
            buffer: RawBuffer::new_from_slice(unsafe {
                core::slice::from_raw_parts_mut(
                    ptr as *mut u8,
                    core::mem::size_of::<T>(),
                )
            }),
        }
    }

    pub fn assume_filled_ref(&self) -> KResult<&T> {
        if !self.buffer.filled() {
            return Err(EFAULT);
        }

        Ok(unsafe { self.data.assume_init_ref() })
    }
}

impl<'lt, T: Copy + Sized> Buffer for UninitBuffer<'lt, T> {
    fn total(&self) -> usize {
        self.buffer.total()
    }

    fn fill(&mut self, data: &[u8]) -> KResult<FillResult> {
        self.buffer.fill(data)
    }

    fn wrote(&self) -> usize {
        self.buffer.count()
    }
}

pub struct RawBuffer<'lt> {
    buf: *mut u8,
    tot: usize,
    cur: usize,
    _phantom: core::marker::PhantomData<&'lt mut u8>,
}

impl<'lt> RawBuffer<'lt> {
    pub fn new_from_mut<T: Copy + Sized>(buf: &'lt mut T) -> Self {
        Self {
            buf: buf as *mut T as *mut u8,
            tot: core::mem::size_of::<T>(),
            cur: 0,
            _phantom: core::marker::PhantomData,
        }
    }

    pub fn new_from_slice<T: Copy + Sized>(buf: &'lt mut [T]) -> Self {
        Self {
            buf: buf.as_mut_ptr() as *mut u8,
            tot: core::mem::size_of::<T>() * buf.len(),
            cur: 0,
            _phantom: core::marker::PhantomData,
        }
    }

    pub fn count(&self) -> usize {
        self.cur
    }

    pub fn total(&self) -> usize {
        self.tot
    }

    pub fn available(&self) -> usize {
        self.total() - self.count()
    }

    pub fn filled(&self) -> bool {
        self.count() == self.total()
    }

    pub fn fill(&mut self, data: &[u8]) -> KResult<FillResult> {
        match self.available() {
            n if n == 0 => Ok(FillResult::Full),
            n if n < data.len() => {
                unsafe {
                    core::ptr::copy_nonoverlapping(
                        data.as_ptr(),
                        self.buf.add(self.count()),
                        n,
                    );
                }
                self.cur += n;
                Ok(FillResult::Partial(n))
            }
            _ => {
                unsafe {
                    core::ptr::copy_nonoverlapping(
                        data.as_ptr(),
                        self.buf.add(self.count()),
                        data.len(),
                    );
                }
                self.cur += data.len();
                Ok(FillResult::Done(data.len()))
            }
        }
    }
}

impl Buffer for RawBuffer<'_> {
    fn total(&self) -> usize {
        RawBuffer::total(self)
    }

    fn fill(&mut self, data: &[u8]) -> KResult<FillResult> {
        RawBuffer::fill(self, data)
    }

    fn wrote(&self) -> usize {
        self.count()
    }
}

pub struct ByteBuffer<'lt> {
    buf: &'lt mut [u8],
    cur: usize,
}

impl<'lt> ByteBuffer<'lt> {
    pub fn new(buf: &'lt mut [u8]) -> Self {
        Self { buf, cur: 0 }
    }

    pub fn available(&self) -> usize {
        self.buf.len() - self.cur
    }

    pub fn data(&self) -> &[u8] {
        &self.buf[..self.cur]
    }
}

impl Buffer for ByteBuffer<'_> {
    fn total(&self) -> usize {
        self.buf.len()
    }

    fn wrote(&self) -> usize {
        self.cur
    }

    fn fill(&mut self, data: &[u8]) -> KResult<FillResult> {
        match self.available() {
            n if n == 0 => Ok(FillResult::Full),
            n if n < data.len() => {
                self.buf[self.cur..].copy_from_slice(&data[..n]);
                self.cur += n;
                Ok(FillResult::Partial(n))
            }
            _ => {
                self.buf[self.cur..self.cur + data.len()].copy_from_slice(data);
                self.cur += data.len();
                Ok(FillResult::Done(data.len()))
            }
        }
    }
}

impl Write for RawBuffer<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        match self.fill(s.as_bytes()) {
            Ok(FillResult::Done(_)) => Ok(()),
            _ => Err(core::fmt::Error),
        }
    }
}

pub fn get_str_from_cstr<'a>(cstr: *const c_char) -> KResult<&'a str> {
    if cstr.is_null() {
        return Err(EFAULT);
    }

    let cstr = unsafe { core::ffi::CStr::from_ptr::<'a>(cstr) };
    cstr.to_str().map_err(|_| EFAULT)
}

/// A source of bytes consumed incrementally by a write path, mirroring
/// [`Buffer`] on the read side.
pub trait Stream {
    /// Copy up to `buf.len()` bytes into `buf`, returning the written prefix.
    /// `Ok(None)` means the stream is exhausted.
    fn poll_data<'a>(&mut self, buf: &'a mut [u8]) -> KResult<Option<&'a mut [u8]>>;

    /// Skip up to `len` bytes without copying them out.
    fn ignore(&mut self, len: usize) -> KResult<Option<usize>>;
}

pub struct ByteStream<'lt> {
    buf: &'lt [u8],
    cur: usize,
}

impl<'lt> ByteStream<'lt> {
    pub fn new(buf: &'lt [u8]) -> Self {
        Self { buf, cur: 0 }
    }
}

impl Stream for ByteStream<'_> {
    fn poll_data<'a>(&mut self, buf: &'a mut [u8]) -> KResult<Option<&'a mut [u8]>> {
        if self.cur >= self.buf.len() {
            return Ok(None);
        }

        let remaining = &self.buf[self.cur..];
        let to_copy = buf.len().min(remaining.len());
        buf[..to_copy].copy_from_slice(&remaining[..to_copy]);
        self.cur += to_copy;

        Ok(Some(&mut buf[..to_copy]))
    }

    fn ignore(&mut self, len: usize) -> KResult<Option<usize>> {
        if self.cur >= self.buf.len() {
            return Ok(None);
        }

        let to_ignore = len.min(self.buf.len() - self.cur);
        self.cur += to_ignore;
        Ok(Some(to_ignore))
    }
}

pub trait IntoStream {
    fn into_stream(&mut self) -> ByteStream<'_>;
}

impl IntoStream for [u8] {
    fn into_stream(&mut self) -> ByteStream<'_> {
        ByteStream::new(self)
    }
}

/// Splits `count` bytes starting at `start` into `(offset, len)` chunks no
/// larger than `chunk_size`.
pub struct Chunks {
    cur: usize,
    end: usize,
    chunk_size: usize,
}

impl Chunks {
    pub fn new(start: usize, count: usize, chunk_size: usize) -> Self {
        Self {
            cur: start,
            end: start + count,
            chunk_size,
        }
    }
}

impl Iterator for Chunks {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur >= self.end {
            return None;
        }

        let len = core::cmp::min(self.chunk_size, self.end - self.cur);
        let cur = self.cur;
        self.cur += len;

        Some((cur, len))
    }
}

/// Copy data from src to dst, starting from offset, and copy at most count bytes.
///
/// # Return
///
/// The number of bytes copied.
pub fn copy_offset_count(
    src: &[u8],
    dst: &mut [u8],
    offset: usize,
    count: usize,
) -> usize {
    if offset >= src.len() {
        return 0;
    }

    let count = {
        let count = count.min(dst.len());

        if offset + count > src.len() {
            src.len() - offset
        } else {
            count
        }
    };

    dst[..count].copy_from_slice(&src[offset..offset + count]);

    count
}
