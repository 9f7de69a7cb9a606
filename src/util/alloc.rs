//! Allocation and destruction counters for tests.

use std::alloc::Layout;
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::memory::{AllocError, Allocator, Global};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZeroSizedType;

/// A value that increments a shared counter every time one of its clones is dropped.
#[derive(Debug, Clone)]
pub struct CountedDrop(pub Rc<RefCell<usize>>);

impl CountedDrop {
    pub fn new(value: usize) -> CountedDrop {
        CountedDrop(Rc::new(RefCell::new(value)))
    }
}

impl Deref for CountedDrop {
    type Target = Rc<RefCell<usize>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for CountedDrop {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Drop for CountedDrop {
    fn drop(&mut self) {
        self.0.replace_with(|v| *v + 1);
    }
}

/// A thread-safe drop counter, for values that have to cross into shared handles or threads.
#[derive(Debug, Clone, Default)]
pub struct SyncCountedDrop(pub Arc<AtomicUsize>);

impl SyncCountedDrop {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Drop for SyncCountedDrop {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct TrackingState {
    live: AtomicUsize,
    total: AtomicUsize,
    remaining: AtomicUsize,
}

/// An allocator that forwards to [`Global`] while counting live allocations. Two instances compare
/// equal when they were created with the same `id`, and every allocator derived from `new` via
/// `Clone` shares its counters. `PROPAGATE` sets all three propagation bits at once.
#[derive(Debug, Clone)]
pub struct TrackingAllocator<const PROPAGATE: bool = false> {
    id: usize,
    state: Arc<TrackingState>,
}

impl<const PROPAGATE: bool> TrackingAllocator<PROPAGATE> {
    pub fn new(id: usize) -> TrackingAllocator<PROPAGATE> {
        TrackingAllocator {
            id,
            state: Arc::new(TrackingState {
                live: AtomicUsize::new(0),
                total: AtomicUsize::new(0),
                remaining: AtomicUsize::new(usize::MAX),
            }),
        }
    }

    pub const fn id(&self) -> usize {
        self.id
    }

    /// The number of allocations that haven't been returned yet.
    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    /// The number of successful allocations over the allocator's lifetime.
    pub fn total(&self) -> usize {
        self.state.total.load(Ordering::SeqCst)
    }

    /// Lets the next `count` allocations succeed and fails every one after that.
    pub fn fail_after(&self, count: usize) {
        self.state.remaining.store(count, Ordering::SeqCst);
    }

    /// Stops injecting failures.
    pub fn heal(&self) {
        self.state.remaining.store(usize::MAX, Ordering::SeqCst);
    }
}

impl<const PROPAGATE: bool> PartialEq for TrackingAllocator<PROPAGATE> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<const PROPAGATE: bool> Allocator for TrackingAllocator<PROPAGATE> {
    const PROPAGATE_ON_COPY_ASSIGN: bool = PROPAGATE;
    const PROPAGATE_ON_MOVE_ASSIGN: bool = PROPAGATE;
    const PROPAGATE_ON_SWAP: bool = PROPAGATE;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let remaining = self.state.remaining.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(AllocError { layout });
        }
        if remaining != usize::MAX {
            self.state.remaining.store(remaining - 1, Ordering::SeqCst);
        }

        let ptr = Global.allocate(layout)?;
        self.state.live.fetch_add(1, Ordering::SeqCst);
        self.state.total.fetch_add(1, Ordering::SeqCst);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.state.live.fetch_sub(1, Ordering::SeqCst);
        // SAFETY: Every pointer handed out by this allocator came from Global with the same layout.
        unsafe { Global.deallocate(ptr, layout) }
    }
}
