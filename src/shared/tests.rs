#![cfg(test)]

use std::collections::HashSet;
use std::fmt::Display;
use std::ptr::NonNull;

use super::*;
use crate::memory::{Allocator, Global};
use crate::util::alloc::{SyncCountedDrop, TrackingAllocator};
use crate::util::panic::assert_panics;

fn leak<T>(value: T) -> NonNull<T> {
    NonNull::from(Box::leak(Box::new(value)))
}

fn unbox<T>(ptr: NonNull<T>) {
    // SAFETY: Only called on pointers from leak.
    drop(unsafe { Box::from_raw(ptr.as_ptr()) })
}

struct Session {
    id: u32,
    drops: SyncCountedDrop,
    this: SharedFromThis<Session>,
}

impl Session {
    fn new(id: u32, drops: &SyncCountedDrop) -> Session {
        Session {
            id,
            drops: drops.clone(),
            this: SharedFromThis::new(),
        }
    }
}

impl EnableSharedFromThis for Session {
    fn shared_from_this_slot(&self) -> &SharedFromThis<Self> {
        &self.this
    }
}

#[test]
fn test_clone_and_drop_counts() {
    let drops = SyncCountedDrop::default();
    let first = SharedHandle::new(drops.clone());
    let mut handles: Vec<_> = (0..10).map(|_| first.clone()).collect();
    assert_eq!(first.use_count(), 11);
    assert!(!first.is_unique());

    handles.truncate(4);
    assert_eq!(first.use_count(), 5);
    drop(handles);
    assert!(first.is_unique());
    assert_eq!(drops.count(), 0);

    drop(first);
    assert_eq!(drops.count(), 1);
}

#[test]
fn test_alias_keeps_owner_alive() {
    let drops = SyncCountedDrop::default();
    let whole = SharedHandle::new((drops.clone(), 7_u32));
    let right = whole.clone().map(|(_, right)| right);

    assert_eq!(whole.use_count(), 2);
    assert_eq!(right.use_count(), 2);
    assert!(whole.owner_eq(&right));
    assert_ne!(whole.owner_ptr(), std::ptr::null());

    drop(whole);
    assert_eq!(*right, 7);
    assert_eq!(right.use_count(), 1);
    assert_eq!(drops.count(), 0);

    drop(right);
    assert_eq!(drops.count(), 1);
}

#[test]
fn test_alias_pointer() {
    let values = SharedHandle::new([1, 2, 3]);
    // SAFETY: The element lives as long as the array.
    let second = unsafe { values.alias(NonNull::from(&values[1])) };
    assert_eq!(*second, 2);
    assert_eq!(values.use_count(), 2);
    assert!(second.owner_eq(&values));

    let empty = SharedHandle::<[i32; 3]>::empty();
    // SAFETY: Aliasing an empty handle never reads the pointer.
    let aliased = unsafe { empty.alias(NonNull::from(&values[0])) };
    assert!(aliased.is_empty());
    assert_eq!(values.use_count(), 2);
}

#[test]
fn test_map_to_trait_object() {
    let shown = SharedHandle::new(42_u8).map::<dyn Display, _>(|value| value);
    assert_eq!(format!("{shown}"), "42");
    assert_eq!(shown.representation(), Some(Representation::InPlace));
}

#[test]
fn test_weak_lock() {
    let strong = SharedHandle::new(5);
    let weak = strong.downgrade();
    assert_eq!(weak.use_count(), 1);
    assert_eq!(weak.weak_count(), 1);
    assert!(!weak.expired());

    let locked = weak.lock();
    assert_eq!(*locked, 5);
    assert_eq!(strong.use_count(), 2);
    assert!(SharedHandle::ptr_eq(&strong, &locked));

    drop(locked);
    drop(strong);
    assert!(weak.expired());
    assert!(weak.lock().is_empty());
    assert_eq!(weak.weak_count(), 1);
}

#[test]
fn test_weak_lock_after_reset() {
    let mut strong = SharedHandle::new(String::from("kept"));
    let weak = strong.downgrade();
    let mut copy = strong.clone();
    strong.reset();

    let locked = weak.lock();
    assert!(!locked.is_empty());
    assert_eq!(locked, copy);
    drop(locked);

    copy.reset();
    assert!(weak.lock().is_empty());
    assert!(weak.expired());
}

#[test]
fn test_weak_count_hides_strong_group() {
    let strong = SharedHandle::new(1);
    assert_eq!(strong.weak_count(), 0);

    let weak = strong.downgrade();
    let other = weak.clone();
    assert_eq!(strong.weak_count(), 2);

    drop(other);
    assert_eq!(weak.weak_count(), 1);

    let empty = WeakHandle::<i32>::new();
    assert!(empty.expired());
    assert_eq!(empty.weak_count(), 0);
    assert!(empty.lock().is_empty());
}

#[test]
fn test_in_place_block_outlives_object() {
    let alloc: TrackingAllocator = TrackingAllocator::new(0);
    let drops = SyncCountedDrop::default();

    let strong = SharedHandle::new_in(drops.clone(), alloc.clone());
    assert_eq!(alloc.live(), 1);
    let weak = strong.downgrade();

    drop(strong);
    assert_eq!(drops.count(), 1);
    assert_eq!(alloc.live(), 1);

    drop(weak);
    assert_eq!(alloc.live(), 0);
    assert_eq!(alloc.total(), 1);
}

#[test]
fn test_failed_allocation_disposes() {
    let alloc: TrackingAllocator = TrackingAllocator::new(0);
    alloc.fail_after(0);
    let drops = SyncCountedDrop::default();

    let ptr = leak(drops.clone());
    // SAFETY: The pointer came from leak and is only disposed of by unbox.
    let result =
        unsafe { SharedHandle::try_from_raw_in(ptr, unbox::<SyncCountedDrop>, alloc.clone()) };
    assert!(result.is_err());
    assert_eq!(drops.count(), 1);
    assert_eq!(alloc.live(), 0);

    let result = SharedHandle::try_new_in(drops.clone(), alloc.clone());
    assert!(result.is_err());
    assert_eq!(drops.count(), 2);

    let ptr = leak(drops.clone());
    assert_panics!({
        // SAFETY: As above.
        unsafe { SharedHandle::from_raw_in(ptr, unbox::<SyncCountedDrop>, alloc.clone()) };
    });
    assert_eq!(drops.count(), 3);
}

#[test]
fn test_raw_disposer() {
    let drops = SyncCountedDrop::default();
    let ptr = leak(drops.clone());

    // SAFETY: The pointer came from leak and is only disposed of by unbox.
    let handle = unsafe { SharedHandle::from_raw(ptr, unbox::<SyncCountedDrop>) };
    let weak = handle.downgrade();
    assert_eq!(handle.representation(), Some(Representation::OutOfPlace));
    assert_eq!(handle.as_ptr(), Some(ptr));

    drop(handle);
    assert_eq!(drops.count(), 1);
    assert!(weak.expired());
}

#[test]
fn test_factory_disposer() {
    let alloc: TrackingAllocator = TrackingAllocator::new(1);
    let drops = SyncCountedDrop::default();

    let ptr: NonNull<SyncCountedDrop> = alloc.allocate_one().unwrap();
    // SAFETY: The slot was just allocated.
    unsafe { alloc.construct(ptr, drops.clone()) };
    // SAFETY: The object came from alloc.
    let handle = unsafe { SharedHandle::from_raw(ptr, Factory(alloc.clone())) };
    assert_eq!(alloc.live(), 1);

    drop(handle);
    assert_eq!(drops.count(), 1);
    assert_eq!(alloc.live(), 0);
}

#[test]
fn test_representations() {
    static ANSWER: u32 = 42;

    assert_eq!(SharedHandle::new(1).representation(), Some(Representation::InPlace));
    assert_eq!(
        SharedHandle::from_box(Box::new(1)).representation(),
        Some(Representation::Adopted)
    );
    assert_eq!(
        SharedHandle::from_static(&ANSWER).representation(),
        Some(Representation::Unmanaged)
    );
    assert_eq!(SharedHandle::<u32>::empty().representation(), None);

    let unmanaged = SharedHandle::from_static(&ANSWER);
    let copy = unmanaged.clone();
    drop(unmanaged);
    drop(copy);
    assert_eq!(ANSWER, 42);

    let raw = leak(3);
    // SAFETY: The pointer came from leak and is only disposed of by unbox.
    let handle = unsafe { SharedHandle::from_raw(raw, unbox::<i32>) };
    assert!(handle.representation().is_some_and(|repr| repr.is_out_of_place()));
}

#[test]
fn test_unsized_objects() {
    let text: SharedHandle<str> = Box::<str>::from("text").into();
    assert_eq!(&*text, "text");
    assert_eq!(text.len(), 4);

    let boxed: Box<dyn Display> = Box::new(5_i32);
    let shown = SharedHandle::from_box(boxed);
    assert_eq!(shown.to_string(), "5");

    let weak = shown.downgrade();
    drop(shown);
    assert!(weak.expired());
}

#[test]
fn test_empty_handle() {
    let mut empty = SharedHandle::<u32>::empty();
    assert!(empty.is_empty());
    assert_eq!(empty.use_count(), 0);
    assert_eq!(empty.weak_count(), 0);
    assert_eq!(empty.get(), None);
    assert_eq!(empty.as_ptr(), None);
    assert_eq!(empty.to_string(), "null");
    assert!(empty.downgrade().expired());
    assert_eq!(empty, SharedHandle::default());

    assert_panics!({
        let value: u32 = *empty;
        println!("{value}");
    });

    let mut full = SharedHandle::new(3);
    empty.swap(&mut full);
    assert_eq!(*empty, 3);
    assert!(full.is_empty());

    empty.reset();
    assert!(empty.is_empty());
}

#[test]
fn test_equality_and_hash() {
    let first = SharedHandle::new(String::from("same"));
    let second = SharedHandle::new(String::from("same"));
    assert_ne!(first, second);
    assert_eq!(first, first.clone());

    let mut seen = HashSet::new();
    assert!(seen.insert(first.clone()));
    assert!(seen.insert(second.clone()));
    assert!(!seen.insert(first.clone()));
    assert_eq!(seen.len(), 2);
}

#[test]
fn test_owner_order() {
    let first = SharedHandle::new(1);
    let second = SharedHandle::new(2);
    assert_ne!(first.owner_before(&second), second.owner_before(&first));
    assert!(!first.owner_before(&first));

    let weak = first.downgrade();
    assert!(weak.owner_eq(&first));
    assert!(!weak.owner_before(&first));
    assert!(!first.owner_before(&weak));

    let empty = SharedHandle::<i32>::empty();
    assert!(empty.owner_before(&first));
    assert!(empty.owner_eq(&WeakHandle::<u8>::new()));
}

#[test]
fn test_shared_from_this() {
    let drops = SyncCountedDrop::default();

    let unmanaged = Session::new(0, &drops);
    assert!(matches!(unmanaged.shared_from_this(), Err(BadWeakHandle)));
    assert!(unmanaged.weak_from_this().expired());

    let plain = SharedHandle::new(Session::new(1, &drops));
    assert!(plain.shared_from_this().is_err());

    let enabled = SharedHandle::new_enabled(Session::new(2, &drops));
    let again = enabled.shared_from_this().unwrap();
    assert_eq!(again.id, 2);
    assert!(SharedHandle::ptr_eq(&enabled, &again));
    assert_eq!(enabled.use_count(), 2);
    assert_eq!(enabled.weak_count(), 1);

    let copy = Session {
        id: enabled.id,
        drops: enabled.drops.clone(),
        this: enabled.this.clone(),
    };
    assert!(copy.shared_from_this().is_err());

    let weak = enabled.weak_from_this();
    drop(again);
    drop(enabled);
    assert!(weak.expired());
    assert_eq!(drops.count(), 1);

    drop((unmanaged, plain, copy));
    assert_eq!(drops.count(), 4);
}

#[test]
fn test_shared_from_this_boxed() {
    let drops = SyncCountedDrop::default();
    let handle = SharedHandle::from_box_enabled(Box::new(Session::new(5, &drops)));
    assert_eq!(handle.representation(), Some(Representation::Adopted));

    let again = handle.shared_from_this().unwrap();
    assert_eq!(again.id, 5);
    drop((handle, again));
    assert_eq!(drops.count(), 1);
}

#[test]
fn test_formatting() {
    let handle = SharedHandle::new(5);
    let debug = format!("{handle:?}");
    assert!(debug.contains("value: Some(5)"));
    assert!(debug.contains("use_count: 1"));
    assert!(debug.contains("InPlace"));
    assert_eq!(handle.to_string(), "5");
    assert!(format!("{handle:p}").starts_with("0x"));

    let weak = handle.downgrade();
    assert_eq!(format!("{weak:?}"), "WeakHandle { use_count: 1, weak_count: 1 }");
}

#[test]
fn test_threads_share_handles() {
    let drops = SyncCountedDrop::default();
    let shared = SharedHandle::new(drops.clone());
    let weak = shared.downgrade();

    crossbeam_utils::thread::scope(|scope| {
        for _ in 0..8 {
            let local = shared.clone();
            let weak = weak.clone();
            scope.spawn(move |_| {
                for _ in 0..1000 {
                    let copy = local.clone();
                    assert!(!weak.lock().is_empty());
                    drop(copy);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(shared.use_count(), 1);
    assert_eq!(shared.weak_count(), 1);
    drop(shared);
    assert_eq!(drops.count(), 1);
    assert!(weak.expired());
}

#[test]
fn test_lock_races_last_drop() {
    let drops = SyncCountedDrop::default();

    for _ in 0..100 {
        let shared = SharedHandle::new(drops.clone());
        let weak = shared.downgrade();

        crossbeam_utils::thread::scope(|scope| {
            scope.spawn(move |_| drop(shared));
            scope.spawn(move |_| {
                let locked = weak.lock();
                if let Some(value) = locked.get() {
                    assert!(value.count() < 100);
                }
            });
        })
        .unwrap();
    }

    assert_eq!(drops.count(), 100);
}

#[test]
fn test_global_in_place() {
    let handle = SharedHandle::try_new_in(vec![1, 2, 3], Global).unwrap();
    assert_eq!(handle.iter().sum::<i32>(), 6);
}
