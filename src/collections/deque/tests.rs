#![cfg(test)]

use std::collections::VecDeque;
use std::mem;

use proptest::prelude::*;

use super::*;
use crate::memory::AllocError;
use crate::util::alloc::{CountedDrop, TrackingAllocator, ZeroSizedType};
use crate::util::error::{CapacityOverflow, IndexOutOfBounds, ReserveError};
use crate::util::panic::assert_panics;

fn contents<T: Clone, A: crate::memory::Allocator>(deque: &Deque<T, A>) -> Vec<T> {
    deque.iter().cloned().collect()
}

#[test]
fn test_push_back_pop_front() {
    let mut deque = Deque::new();
    for i in 0..1000 {
        deque.push_back(i);
    }
    for i in 0..500 {
        assert_eq!(deque.pop_front(), Some(i));
    }

    assert_eq!(deque.len(), 500);
    assert_eq!(deque.front(), Some(&500));
    assert_eq!(deque.back(), Some(&999));
}

#[test]
fn test_block_len() {
    fn check<T>() {
        let len = block_len::<T>();
        assert!(len >= 16, "A block should hold at least 16 elements.");
        assert!(
            len == 16 || len * mem::size_of::<T>() >= 200 - mem::size_of::<T>(),
            "Blocks of small elements should fill about 200 bytes."
        );
    }

    check::<u8>();
    check::<u16>();
    check::<u64>();
    check::<[u8; 13]>();
    check::<[u8; 200]>();
    check::<ZeroSizedType>();

    assert_eq!(block_len::<u8>(), 200);
    assert_eq!(block_len::<[u8; 12]>(), 16);
    assert_eq!(block_len::<ZeroSizedType>(), 16);
}

#[test]
fn test_pushes_keep_addresses() {
    let mut deque = Deque::new();
    deque.push_back(0_u64);
    let first: *const u64 = &deque[0];

    for i in 1..500 {
        deque.push_back(i);
        deque.push_front(i);
    }

    assert_eq!(deque.len(), 999);
    assert!(
        std::ptr::eq(first, &deque[499]),
        "Pushing at either end should never move existing elements."
    );
}

#[test]
fn test_middle_insert_moves_shorter_side() {
    let mut deque: Deque<u32> = (0..1000).collect();
    let addresses: Vec<*const u32> = (10..1000).map(|i| &deque[i] as *const u32).collect();

    deque.insert(10, 5000);

    assert_eq!(deque.len(), 1001);
    assert_eq!(deque[10], 5000);
    for (i, address) in (10..1000).zip(addresses) {
        assert_eq!(deque[i + 1], i as u32);
        assert!(
            std::ptr::eq(address, &deque[i + 1]),
            "Elements after the insertion point shouldn't move when the front is shorter."
        );
    }
}

#[test]
fn test_insert_tie_moves_back() {
    let mut deque: Deque<u8> = (0..4).collect();
    let front: Vec<*const u8> = (0..2).map(|i| &deque[i] as *const u8).collect();

    deque.insert(2, 9);

    assert_eq!(contents(&deque), [0, 1, 9, 2, 3]);
    for (i, address) in front.into_iter().enumerate() {
        assert!(
            std::ptr::eq(address, &deque[i]),
            "With equal sides, the elements after the insertion point should be the ones moved."
        );
    }
}

#[test]
fn test_insert_iter_both_sides() {
    let mut deque: Deque<u8> = (0..10).collect();
    assert_eq!(deque.insert_iter(2, [20, 21, 22]), 3);
    assert_eq!(contents(&deque), [0, 1, 20, 21, 22, 2, 3, 4, 5, 6, 7, 8, 9]);

    assert_eq!(deque.insert_iter(11, 30..32), 2);
    assert_eq!(
        contents(&deque),
        [0, 1, 20, 21, 22, 2, 3, 4, 5, 6, 7, 30, 31, 8, 9]
    );

    deque.insert_n(0, 2, 7);
    assert_eq!(contents(&deque)[..3], [7, 7, 0]);
    assert_eq!(deque.insert_iter(deque.len(), []), 0);
}

#[test]
fn test_insert_iter_panic_restores_deque() {
    let mut deque: Deque<u32> = (0..100).collect();

    assert_panics!({
        deque.insert_iter(
            90,
            (0..50).map(|i| if i == 30 { panic!("iterator failure") } else { i }),
        );
    });

    assert_eq!(
        contents(&deque),
        (0..100).collect::<Vec<_>>(),
        "A failed range insertion should remove the items it already inserted."
    );
}

#[test]
fn test_remove_and_erase() {
    let mut deque: Deque<u16> = (0..100).collect();

    assert_eq!(deque.remove(3), 3);
    assert_eq!(deque.remove(90), 91);
    assert_eq!(deque.try_remove(98), Err(IndexOutOfBounds { index: 98, len: 98 }));

    deque.erase(..5);
    assert_eq!(deque.front(), Some(&6));
    deque.erase(80..);
    assert_eq!(deque.len(), 80);
    assert_eq!(deque.back(), Some(&85));
    deque.erase(10..=19);
    assert_eq!(deque.len(), 70);
    assert_eq!(deque[9], 15);
    assert_eq!(deque[10], 26);

    assert_panics!({ deque.erase(60..71) });
    assert_panics!({ deque.remove(70) });
}

#[test]
fn test_truncate_retain_resize() {
    let mut deque: Deque<u32> = (0..200).collect();

    deque.retain(|i| i % 3 == 0);
    assert_eq!(deque.len(), 67);
    assert!(deque.iter().all(|i| i % 3 == 0));
    assert_eq!(deque.back(), Some(&198));

    deque.truncate(10);
    assert_eq!(contents(&deque), (0..30).step_by(3).collect::<Vec<_>>());

    deque.resize(13, 1);
    assert_eq!(contents(&deque)[10..], [1, 1, 1]);
    deque.resize_default(100);
    assert_eq!(deque.len(), 100);
    assert_eq!(deque[99], 0);
    let mut next = 0;
    deque.resize_with(130, || {
        next += 1;
        next
    });
    assert_eq!(contents(&deque)[100..], (1..=30).collect::<Vec<_>>());
    deque.resize(2, 0);
    assert_eq!(contents(&deque), [0, 3]);
}

#[test]
fn test_resize_with_panic_keeps_produced_values() {
    let counter = CountedDrop::new(0);
    let mut deque: Deque<CountedDrop> = (0..5).map(|_| counter.clone()).collect();

    let mut produced = 0;
    assert_panics!({
        deque.resize_with(1000, || {
            if produced == 150 {
                panic!("out of values");
            }
            produced += 1;
            counter.clone()
        })
    });
    assert_eq!(deque.len(), 155, "Every value produced before the panic should stay.");
    assert_eq!(*counter.borrow(), 0);

    deque.truncate(5);
    assert_eq!(*counter.borrow(), 150);
    drop(deque);
    assert_eq!(*counter.borrow(), 155);
}

#[test]
fn test_assign() {
    let mut deque: Deque<char> = "abc".chars().collect();
    deque.assign_iter("xyz!".chars());
    assert_eq!(deque.to_string(), "!['x', 'y', 'z', '!']");

    deque.assign_n(2, '-');
    assert_eq!(contents(&deque), ['-', '-']);

    assert_panics!({
        deque.assign_iter("panic".chars().map(|c| if c == 'i' { panic!("mid-assign") } else { c }))
    });
    assert_eq!(
        contents(&deque),
        ['-', '-'],
        "Assigning from a range should leave the Deque unchanged if the range panics."
    );
}

#[test]
fn test_clear_and_shrink() {
    let alloc = TrackingAllocator::<false>::new(0);
    let mut deque = Deque::new_in(alloc.clone());
    assert_eq!(alloc.live(), 0, "Creating a Deque shouldn't allocate.");

    for i in 0..1000_u64 {
        deque.push_front(i);
    }
    deque.clear();
    assert!(deque.is_empty());
    assert_eq!(
        alloc.live(),
        2,
        "Clearing should keep only the directory and the block holding the front."
    );

    deque.push_back(1);
    deque.reserve_back(500);
    deque.shrink_to_fit();
    assert_eq!(alloc.live(), 2);

    deque.pop_back();
    deque.shrink_to_fit();
    assert_eq!(alloc.live(), 0, "An empty Deque should give back all of its memory.");
    drop(deque);
}

#[test]
fn test_push_failure_leaves_deque_unchanged() {
    let alloc = TrackingAllocator::<false>::new(0);
    let mut deque: Deque<u64, _> = Deque::new_in(alloc.clone());

    // The first block is 25 slots long with the first element in the middle, so the 13th push
    // needs a new block.
    for i in 0..12 {
        deque.push_back(i);
    }
    assert_eq!(alloc.live(), 2);

    alloc.fail_after(0);
    assert!(matches!(
        deque.try_push_back(12),
        Err(ReserveError::AllocError(AllocError { .. }))
    ));
    assert_eq!(contents(&deque), (0..12).collect::<Vec<_>>());
    assert_eq!(alloc.live(), 2);
    assert_panics!({ deque.push_back(12) });

    alloc.heal();
    deque.push_back(12);
    assert_eq!(deque.len(), 13);
    assert_eq!(alloc.live(), 3);
}

#[test]
fn test_reserve_failure_frees_new_blocks() {
    let alloc = TrackingAllocator::<false>::new(0);
    let mut deque: Deque<u64, _> = Deque::new_in(alloc.clone());
    deque.push_back(0);
    assert_eq!(alloc.live(), 2);

    // Four blocks are needed in front, the second one fails.
    alloc.fail_after(1);
    assert!(deque.try_reserve_front(100).is_err());
    assert_eq!(
        alloc.live(),
        2,
        "Blocks created by a failed reservation should be freed again."
    );
    assert_eq!(contents(&deque), [0]);

    alloc.heal();
    deque.reserve_front(100);
    let live = alloc.live();
    for i in 0..100 {
        deque.push_front(i);
    }
    assert_eq!(alloc.live(), live, "Reserved blocks should absorb the pushes.");
}

#[test]
fn test_capacity_overflow() {
    let mut deque: Deque<u64> = Deque::new();
    assert_eq!(
        deque.try_reserve_back(usize::MAX),
        Err(ReserveError::CapacityOverflow(CapacityOverflow))
    );
    assert_eq!(Deque::<u64>::max_len(), isize::MAX as usize / 8);
    assert!(deque.is_empty());
}

#[test]
fn test_drop_counts() {
    let counter = CountedDrop::new(0);
    let mut deque = Deque::new();
    for _ in 0..100 {
        deque.push_back(counter.clone());
        deque.push_front(counter.clone());
    }

    deque.truncate(150);
    assert_eq!(*counter.borrow(), 50);
    deque.erase(10..20);
    assert_eq!(*counter.borrow(), 60);
    drop(deque.pop_front());
    drop(deque.remove(70));
    assert_eq!(*counter.borrow(), 62);

    drop(deque);
    assert_eq!(*counter.borrow(), 200, "Every element should be dropped exactly once.");
}

#[test]
fn test_zst_support() {
    let mut deque = Deque::repeat_default(1000);
    deque.push_front(ZeroSizedType);
    deque.insert(500, ZeroSizedType);
    assert_eq!(deque.len(), 1002);
    assert_eq!(deque.iter().count(), 1002);
    assert_eq!(deque.iter().rev().count(), 1002);
    assert_eq!(deque.cursor_end() - deque.cursor_front(), 1002);
    deque.erase(..1000);
    assert_eq!(deque.len(), 2);
}

#[test]
fn test_cursor_arithmetic() {
    let deque: Deque<u8> = (0..=255).collect();
    let begin = deque.cursor_front();
    let end = deque.cursor_end();

    assert_eq!(end - begin, 256);
    assert_eq!(begin - end, -256);
    assert_eq!((begin + 200).get(), Some(&200));
    assert_eq!((end - 1).get(), Some(&255));
    assert_eq!(end.get(), None);
    assert_eq!(begin + 256, end);
    assert!(begin < end);
    assert!(begin + 17 > begin + 16);
    assert_eq!(deque.cursor_at(37).index(), 37);
    assert_eq!(begin.checked_offset(-1), None);
    assert_eq!(end.checked_offset(1), None);

    let mut cursor = deque.cursor_at(254);
    assert!(cursor.move_next());
    assert!(cursor.move_next());
    assert!(!cursor.move_next());
    assert_eq!(cursor, end);
    assert!(cursor.move_prev());
    assert_eq!(cursor.get(), Some(&255));

    assert_panics!({ begin - 1 });
    assert_panics!({ end + 1 });
}

#[test]
fn test_iterators() {
    let mut deque: Deque<u32> = (0..100).collect();
    for value in deque.iter_mut() {
        *value *= 2;
    }

    let mut iter = deque.iter();
    assert_eq!(iter.len(), 100);
    assert_eq!(iter.nth(50), Some(&100));
    assert_eq!(iter.next_back(), Some(&198));
    assert_eq!(iter.len(), 48);
    assert_eq!(iter.nth(100), None);
    assert_eq!(iter.next(), None);

    let chunks: Vec<usize> = deque.chunks().map(<[u32]>::len).collect();
    assert_eq!(chunks.iter().sum::<usize>(), 100);
    assert!(chunks.iter().all(|&len| len <= block_len::<u32>()));

    let mut into_iter = deque.into_iter();
    assert_eq!(into_iter.next_back(), Some(198));
    assert_eq!(into_iter.next(), Some(0));
    assert_eq!(into_iter.len(), 98);
}

#[test]
fn test_comparisons_and_formatting() {
    let a: Deque<u8> = (0..5).collect();
    let mut b = Deque::from([0, 1, 2, 3]);
    assert!(b < a);
    b.push_back(4);
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "![0, 1, 2, 3, 4]");
    assert!(format!("{a:?}").starts_with("Deque { contents: [0, 1, 2, 3, 4], len: 5"));

    let mut c = a.clone();
    c[4] = 9;
    assert!(c > a);
    assert_panics!({ c[5] });
}

#[test]
fn test_swap_equal_allocators_exchanges_storage() {
    let alloc = TrackingAllocator::<false>::new(0);
    let mut a: Deque<u32, _> = Deque::new_in(alloc.clone());
    let mut b: Deque<u32, _> = Deque::new_in(alloc.clone());
    a.extend(0..100);
    b.extend(100..150);
    let first: *const u32 = &a[0];
    let total = alloc.total();

    a.swap(&mut b);

    assert_eq!(contents(&a), (100..150).collect::<Vec<_>>());
    assert_eq!(contents(&b), (0..100).collect::<Vec<_>>());
    assert!(std::ptr::eq(first, &b[0]), "Swapping should exchange storage, not elements.");
    assert_eq!(alloc.total(), total);
}

#[test]
fn test_swap_unequal_allocators() {
    let one = TrackingAllocator::<false>::new(1);
    let two = TrackingAllocator::<false>::new(2);
    let mut a: Deque<u32, _> = Deque::new_in(one.clone());
    let mut b: Deque<u32, _> = Deque::new_in(two.clone());
    a.extend(0..100);
    b.extend(100..150);

    a.swap(&mut b);

    assert_eq!(contents(&a), (100..150).collect::<Vec<_>>());
    assert_eq!(contents(&b), (0..100).collect::<Vec<_>>());
    assert_eq!(a.allocator().id(), 1, "Non-propagating allocators should stay in place.");
    assert_eq!(b.allocator().id(), 2);

    drop(a);
    assert_eq!(one.live(), 0, "Elements should have been moved into memory from `one`.");
    drop(b);
    assert_eq!(two.live(), 0);
}

#[test]
fn test_swap_propagating_allocators() {
    let mut a: Deque<u32, _> = Deque::new_in(TrackingAllocator::<true>::new(1));
    let mut b: Deque<u32, _> = Deque::new_in(TrackingAllocator::<true>::new(2));
    a.push_back(1);

    a.swap(&mut b);

    assert_eq!(a.allocator().id(), 2);
    assert_eq!(b.allocator().id(), 1);
    assert_eq!(contents(&b), [1]);
}

#[test]
fn test_assign_from_and_clone_from() {
    let one = TrackingAllocator::<false>::new(1);
    let two = TrackingAllocator::<false>::new(2);

    let mut a: Deque<String, _> = Deque::new_in(one.clone());
    a.push_back(String::from("old"));
    let mut source = Deque::new_in(two.clone());
    source.extend(["x", "y"].map(String::from));

    a.assign_from(source);
    assert_eq!(contents(&a), ["x", "y"]);
    assert_eq!(a.allocator().id(), 1);
    assert_eq!(two.live(), 0, "The source should have been dropped along with its memory.");

    let mut b = Deque::new_in(two.clone());
    b.extend(["1", "2", "3"].map(String::from));
    a.clone_from(&b);
    assert_eq!(contents(&a), ["1", "2", "3"]);
    assert_eq!(a.allocator().id(), 1);

    let mut c = Deque::new_in(TrackingAllocator::<true>::new(3));
    c.push_back(String::from("c"));
    let d = Deque::new_in(TrackingAllocator::<true>::new(4));
    c.clone_from(&d);
    assert!(c.is_empty());
    assert_eq!(c.allocator().id(), 4, "A propagating allocator should follow the copy.");
}

#[derive(Debug, Clone)]
enum Op {
    PushBack(u16),
    PushFront(u16),
    PopBack,
    PopFront,
    Insert(usize, u16),
    Remove(usize),
    Erase(usize, usize),
    Truncate(usize),
    Clear,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u16>().prop_map(Op::PushBack),
        4 => any::<u16>().prop_map(Op::PushFront),
        2 => Just(Op::PopBack),
        2 => Just(Op::PopFront),
        2 => (any::<usize>(), any::<u16>()).prop_map(|(i, v)| Op::Insert(i, v)),
        1 => any::<usize>().prop_map(Op::Remove),
        1 => (any::<usize>(), 0..40_usize).prop_map(|(i, n)| Op::Erase(i, n)),
        1 => any::<usize>().prop_map(Op::Truncate),
        1 => Just(Op::Clear),
    ]
}

// Property: a Deque behaves like VecDeque under random operation sequences, and cursor arithmetic
// agrees with indices after every operation.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_matches_vec_deque(ops in proptest::collection::vec(arb_op(), 1..400)) {
        let mut sut: Deque<u16> = Deque::new();
        let mut model: VecDeque<u16> = VecDeque::new();

        for op in ops {
            match op {
                Op::PushBack(v) => {
                    sut.push_back(v);
                    model.push_back(v);
                },
                Op::PushFront(v) => {
                    sut.push_front(v);
                    model.push_front(v);
                },
                Op::PopBack => prop_assert_eq!(sut.pop_back(), model.pop_back()),
                Op::PopFront => prop_assert_eq!(sut.pop_front(), model.pop_front()),
                Op::Insert(i, v) => {
                    let i = i % (model.len() + 1);
                    sut.insert(i, v);
                    model.insert(i, v);
                },
                Op::Remove(i) => {
                    if !model.is_empty() {
                        let i = i % model.len();
                        prop_assert_eq!(Some(sut.remove(i)), model.remove(i));
                    }
                },
                Op::Erase(i, n) => {
                    let start = i % (model.len() + 1);
                    let end = usize::min(start + n, model.len());
                    sut.erase(start..end);
                    model.drain(start..end).for_each(drop);
                },
                Op::Truncate(n) => {
                    let n = n % (model.len() + 1);
                    sut.truncate(n);
                    model.truncate(n);
                },
                Op::Clear => {
                    sut.clear();
                    model.clear();
                },
            }

            prop_assert_eq!(sut.len(), model.len());
            prop_assert!(sut.iter().eq(model.iter()));
            prop_assert!(sut.iter().rev().eq(model.iter().rev()));
            prop_assert_eq!(sut.cursor_end() - sut.cursor_front(), model.len() as isize);
            if !model.is_empty() {
                let middle = model.len() / 2;
                let cursor = sut.cursor_front() + middle as isize;
                prop_assert_eq!(cursor.index(), middle);
                prop_assert_eq!(cursor.get(), model.get(middle));
                prop_assert_eq!(sut.cursor_end() - cursor, (model.len() - middle) as isize);
            }
        }
    }
}
