//! Buffer classes: the allocator policy a [`crate::Buffer`] is built from.
//!
//! Grounded in `rn_buffer_class` from the original buffer implementation:
//! a small record of function pointers a buffer consults whenever it needs
//! to grow, shrink or release its backing memory. The default class drives
//! the global allocator with geometric growth; a caller can supply its own
//! class to back a buffer with a fixed arena, a memory-mapped region, or
//! anything else that fits the same four operations.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::BufferError;

/// Runs once, right after a buffer's backing memory is first allocated.
/// Classes that need to stamp a header into the buffer (checksums,
/// reference counts) hook this rather than the constructor, since it also
/// runs after `dup_class` reallocates into a new class.
pub type InitFn = fn(ptr: NonNull<u8>, msize: usize);

/// Decides the next capacity to request given the current capacity and
/// the size actually needed. Returning `None` means "cannot grow further"
/// (distinct from `maxsize`, which caps the result unconditionally).
pub type GrowthFn = fn(current_msize: usize, requested: usize) -> Option<usize>;

/// Allocates `size` bytes, or `None` on failure.
pub type MallocFn = fn(size: usize) -> Option<NonNull<u8>>;

/// Resizes the allocation at `ptr` (of `old_size` bytes) to `new_size`
/// bytes, or `None` on failure (in which case `ptr` is left untouched).
pub type ReallocFn = fn(ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>>;

/// Releases the allocation at `ptr`, which was `size` bytes.
pub type FreeFn = fn(ptr: NonNull<u8>, size: usize);

/// Allocator policy a [`crate::Buffer`] is created with.
///
/// A class with `malloc == None` describes a non-owning buffer: its
/// memory was supplied by the caller (`Buffer::wrap`/`Buffer::wrap_mut`)
/// and the buffer will never attempt to allocate, grow or free it.
#[derive(Clone, Copy)]
pub struct BufferClass {
    /// Capacity requested for a freshly created owning buffer.
    pub inisize: usize,
    /// Hard ceiling on capacity; `0` means unbounded. Growth requests
    /// that would cross this return [`BufferError::LimitExceeded`].
    pub maxsize: usize,
    pub init: Option<InitFn>,
    pub growthsize: Option<GrowthFn>,
    pub malloc: Option<MallocFn>,
    pub realloc: Option<ReallocFn>,
    pub free: Option<FreeFn>,
}

impl BufferClass {
    /// Whether buffers built from this class own (and may resize) their
    /// backing memory.
    pub const fn is_owning(&self) -> bool {
        self.malloc.is_some()
    }
}

fn default_malloc(size: usize) -> Option<NonNull<u8>> {
    if size == 0 {
        return Some(NonNull::dangling());
    }
    let layout = Layout::from_size_align(size, std::mem::align_of::<u8>()).ok()?;
    let ptr = unsafe { alloc::alloc(layout) };
    NonNull::new(ptr)
}

fn default_realloc(ptr: NonNull<u8>, old_size: usize, new_size: usize) -> Option<NonNull<u8>> {
    let old_layout = Layout::from_size_align(old_size.max(1), std::mem::align_of::<u8>()).ok()?;
    if new_size == 0 {
        unsafe { alloc::dealloc(ptr.as_ptr(), old_layout) };
        return Some(NonNull::dangling());
    }
    let new_ptr = unsafe { alloc::realloc(ptr.as_ptr(), old_layout, new_size) };
    NonNull::new(new_ptr)
}

fn default_free(ptr: NonNull<u8>, size: usize) {
    if size == 0 {
        return;
    }
    let layout = Layout::from_size_align(size, std::mem::align_of::<u8>())
        .expect("buffer capacity was allocated under this same layout");
    unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
}

/// Doubles capacity until it covers `requested`, the same growth curve as
/// `rn_buffer_extend`'s default class.
fn default_growthsize(current_msize: usize, requested: usize) -> Option<usize> {
    let mut next = current_msize.max(1);
    while next < requested {
        next = next.checked_mul(2)?;
    }
    Some(next)
}

/// The class used by [`crate::Buffer::new`] when no class is supplied:
/// geometric growth over the global allocator, unbounded capacity.
pub static DEFAULT: BufferClass = BufferClass {
    inisize: 64,
    maxsize: 0,
    init: None,
    growthsize: Some(default_growthsize),
    malloc: Some(default_malloc),
    realloc: Some(default_realloc),
    free: Some(default_free),
};

/// The class backing [`crate::Buffer::wrap`]/[`crate::Buffer::wrap_mut`]:
/// no allocator functions at all, so the buffer can never grow or free
/// its memory — it only ever borrows what the caller handed it.
pub static STATIC: BufferClass = BufferClass {
    inisize: 0,
    maxsize: 0,
    init: None,
    growthsize: None,
    malloc: None,
    realloc: None,
    free: None,
};

/// Builds a custom [`BufferClass`], defaulting unset fields to the
/// default class's allocator (global heap, geometric growth).
#[derive(Clone, Copy)]
pub struct BufferClassBuilder {
    inisize: usize,
    maxsize: usize,
    init: Option<InitFn>,
    growthsize: Option<GrowthFn>,
    malloc: Option<MallocFn>,
    realloc: Option<ReallocFn>,
    free: Option<FreeFn>,
}

impl Default for BufferClassBuilder {
    fn default() -> Self {
        Self {
            inisize: DEFAULT.inisize,
            maxsize: DEFAULT.maxsize,
            init: None,
            growthsize: Some(default_growthsize),
            malloc: Some(default_malloc),
            realloc: Some(default_realloc),
            free: Some(default_free),
        }
    }
}

impl BufferClassBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inisize(mut self, inisize: usize) -> Self {
        self.inisize = inisize;
        self
    }

    pub fn maxsize(mut self, maxsize: usize) -> Self {
        self.maxsize = maxsize;
        self
    }

    pub fn init(mut self, init: InitFn) -> Self {
        self.init = Some(init);
        self
    }

    pub fn growthsize(mut self, growthsize: GrowthFn) -> Self {
        self.growthsize = Some(growthsize);
        self
    }

    pub fn allocator(mut self, malloc: MallocFn, realloc: ReallocFn, free: FreeFn) -> Self {
        self.malloc = Some(malloc);
        self.realloc = Some(realloc);
        self.free = Some(free);
        self
    }

    pub const fn build(self) -> BufferClass {
        BufferClass {
            inisize: self.inisize,
            maxsize: self.maxsize,
            init: self.init,
            growthsize: self.growthsize,
            malloc: self.malloc,
            realloc: self.realloc,
            free: self.free,
        }
    }
}

pub(crate) fn checked_growth(
    class: &BufferClass,
    current_msize: usize,
    requested: usize,
) -> Result<usize, BufferError> {
    let growth = class.growthsize.unwrap_or(default_growthsize);
    let next = growth(current_msize, requested).ok_or(BufferError::LimitExceeded)?;
    if class.maxsize != 0 && next > class.maxsize {
        if requested > class.maxsize {
            return Err(BufferError::LimitExceeded);
        }
        return Ok(class.maxsize);
    }
    Ok(next)
}
