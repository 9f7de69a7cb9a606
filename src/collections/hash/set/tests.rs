#![cfg(test)]

use super::*;
use crate::collections::hash::policy::DefaultEqual;
use crate::memory::Global;
use crate::util::alloc::TrackingAllocator;
use crate::util::hash::{BadHasherBuilder, ManualHash};

fn sorted<T: Clone + Ord>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort();
    items
}

#[test]
fn test_hash_collisions() {
    let mut set = HashSet::with_parts(11, BadHasherBuilder, DefaultEqual, Global);
    set.insert(ManualHash::new(0, "zero"));
    set.insert(ManualHash::new(0, "one"));
    set.insert(ManualHash::new(2, "two"));
    set.insert(ManualHash::new(0, "three"));
    set.insert(ManualHash::new(2, "four"));
    set.insert(ManualHash::new(1, "five"));

    set.remove(&ManualHash::new(0, "zero"));
    set.remove(&ManualHash::new(2, "two"));

    assert_eq!(
        set.into_iter().map(|i| i.value()).collect::<Vec<_>>(),
        ["five", "four", "three", "one"],
        "HashSet should handle hash collisions so that no elements are lost during removal."
    );

    let mut set = HashSet::with_parts(6, BadHasherBuilder, DefaultEqual, Global);
    set.insert(ManualHash::new(5, "zero"));
    set.insert(ManualHash::new(16, "one"));
    set.insert(ManualHash::new(1, "two"));
    set.insert(ManualHash::new(27, "three"));
    assert_eq!(set.bucket_count(), 11);
    assert_eq!(set.bucket_len(5), 3);

    set.remove(&ManualHash::new(5, "zero"));

    assert_eq!(
        set.into_iter().map(|i| i.value()).collect::<Vec<_>>(),
        ["two", "three", "one"],
        "Values that share a bucket should stay in one run."
    );
}

#[test]
fn test_insert_and_lookup() {
    let mut set = HashSet::new();
    assert!(set.insert(String::from("a")));
    assert!(!set.insert(String::from("a")));
    assert!(set.insert(String::from("b")));

    assert!(set.contains("a"));
    assert!(!set.contains("c"));
    assert_eq!(set.get("b").map(String::as_str), Some("b"));
    assert_eq!(set.replace(String::from("b")), Some(String::from("b")));
    assert_eq!(set.replace(String::from("c")), None);
    assert_eq!(set.len(), 3);

    assert_eq!(set.take("a"), Some(String::from("a")));
    assert!(!set.remove("a"));
    assert!(set.remove("b"));
    assert_eq!(sorted(set.iter().cloned()), ["c"]);
    assert!(set.load_factor() <= set.max_load_factor());
}

#[test]
fn test_set_operations() {
    let a = HashSet::from([1, 2, 3, 4]);
    let b = HashSet::from([3, 4, 5]);

    assert_eq!(sorted(a.difference(&b).copied()), [1, 2]);
    assert_eq!(sorted(a.intersection(&b).copied()), [3, 4]);
    assert_eq!(sorted(a.union(&b).copied()), [1, 2, 3, 4, 5]);
    assert_eq!(sorted(a.symmetric_difference(&b).copied()), [1, 2, 5]);

    assert_eq!(&a | &b, HashSet::from([1, 2, 3, 4, 5]));
    assert_eq!(&a & &b, HashSet::from([3, 4]));
    assert_eq!(&a ^ &b, HashSet::from([1, 2, 5]));
    assert_eq!(&a - &b, HashSet::from([1, 2]));

    let small = HashSet::from([3, 4]);
    assert!(small.is_subset(&a));
    assert!(a.is_superset(&small));
    assert!(!a.is_subset(&small));
    assert!(a.is_disjoint(&HashSet::from([7, 8])));
    assert!(!a.is_disjoint(&b));
}

#[test]
fn test_retain_drain_and_clone() {
    let alloc = TrackingAllocator::<false>::new(0);
    let mut set = HashSet::new_in(alloc.clone());
    set.extend(0..20);

    set.retain(|i| i % 4 == 0);
    assert_eq!(sorted(set.iter().copied()), [0, 4, 8, 12, 16]);

    let clone = set.clone();
    assert_eq!(clone, set);
    assert_eq!(clone.allocator(), &alloc);

    assert_eq!(sorted(set.drain()), [0, 4, 8, 12, 16]);
    assert!(set.is_empty());
    drop(set);
    drop(clone);
    assert_eq!(alloc.live(), 0);
}

#[test]
fn test_formatting() {
    let set = HashSet::from([7]);
    assert_eq!(format!("{}", set), "#{7}");
    assert_eq!(
        format!("{:?}", set),
        "HashSet { contents: [7], len: 1, bucket_count: 2, max_load_factor: 1.0 }"
    );
}
