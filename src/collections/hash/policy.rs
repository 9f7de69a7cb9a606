//! Hashing and equality policies, and the sequence of bucket counts a map grows through.

use std::hash::{BuildHasher, Hash};

/// Hashes keys of type `Q` for a hash-based collection.
///
/// Every [`BuildHasher`] is a `KeyHasher` for all [`Hash`] types, so the standard
/// [`RandomState`](std::hash::RandomState) works as is. Use [`FnHasher`] to hash with a closure.
///
/// Keys that are equal under the collection's [`KeyEqual`] policy must hash equally.
pub trait KeyHasher<Q: ?Sized> {
    /// Returns the hash of `key`.
    fn hash_key(&self, key: &Q) -> u64;
}

impl<Q: Hash + ?Sized, B: BuildHasher> KeyHasher<Q> for B {
    fn hash_key(&self, key: &Q) -> u64 {
        self.hash_one(key)
    }
}

/// A [`KeyHasher`] that calls a closure.
///
/// # Examples
/// ```
/// # use core_containers::collections::hash::{FnHasher, HashMap, DefaultEqual};
/// let mut map = HashMap::with_policies(FnHasher(|key: &u64| *key), DefaultEqual);
/// map.insert(7, "seven");
/// assert_eq!(map.bucket_of(&7), 7 % map.bucket_count());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FnHasher<F>(pub F);

impl<Q: ?Sized, F: Fn(&Q) -> u64> KeyHasher<Q> for FnHasher<F> {
    fn hash_key(&self, key: &Q) -> u64 {
        (self.0)(key)
    }
}

/// Decides whether two keys of type `Q` are the same key. Must be an equivalence relation.
pub trait KeyEqual<Q: ?Sized> {
    /// Returns true if `a` and `b` are the same key.
    fn key_eq(&self, a: &Q, b: &Q) -> bool;
}

/// The [`KeyEqual`] policy that uses [`PartialEq`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DefaultEqual;

impl<Q: PartialEq + ?Sized> KeyEqual<Q> for DefaultEqual {
    fn key_eq(&self, a: &Q, b: &Q) -> bool {
        a == b
    }
}

/// A [`KeyEqual`] policy that calls a closure.
#[derive(Debug, Clone, Copy, Default)]
pub struct FnEqual<F>(pub F);

impl<Q: ?Sized, F: Fn(&Q, &Q) -> bool> KeyEqual<Q> for FnEqual<F> {
    fn key_eq(&self, a: &Q, b: &Q) -> bool {
        (self.0)(a, b)
    }
}

/// The bucket count of a map that has never allocated. It stands for a single, always empty bucket.
pub const SENTINEL_BUCKETS: usize = 1;

// Each prime is at least twice the previous one.
const PRIMES: [usize; 32] = [
    2, 5, 11, 23, 53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613,
    393241, 786433, 1572869, 3145739, 6291469, 12582917, 25165843, 50331653, 100663319, 201326611,
    402653189, 805306457, 1610612741, 3221225473, 4294967291,
];

/// Returns the smallest bucket count in the growth sequence that is at least `min`, or [`None`] if
/// there is no such count.
///
/// The sequence is a fixed table of primes up to `4294967291`. Past the table, each count is the
/// next prime above twice the previous count plus one.
///
/// # Examples
/// ```
/// # use core_containers::collections::hash::policy::next_bucket_count;
/// assert_eq!(next_bucket_count(0), Some(2));
/// assert_eq!(next_bucket_count(16), Some(23));
/// assert_eq!(next_bucket_count(23), Some(23));
/// assert_eq!(next_bucket_count(usize::MAX), None);
/// ```
pub fn next_bucket_count(min: usize) -> Option<usize> {
    if let Some(&prime) = PRIMES.iter().find(|&&prime| prime >= min) {
        return Some(prime);
    }

    let mut count = *PRIMES.last()?;
    while count < min {
        count = next_prime(count.checked_mul(2)?.checked_add(2)?)?;
    }
    Some(count)
}

/// Returns the smallest prime that is at least `from`.
fn next_prime(from: usize) -> Option<usize> {
    let mut candidate = from | 1;
    loop {
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_add(2)?;
    }
}

fn is_prime(n: usize) -> bool {
    if n < 4 {
        return n >= 2;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut divisor = 5;
    while divisor <= n / divisor {
        if n % divisor == 0 || n % (divisor + 2) == 0 {
            return false;
        }
        divisor += 6;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_sequence() {
        for window in PRIMES.windows(2) {
            assert!(window[1] >= window[0] * 2, "Each count should at least double.");
            assert!(is_prime(window[1]));
        }

        assert_eq!(next_bucket_count(1), Some(2));
        assert_eq!(next_bucket_count(3), Some(5));
        assert_eq!(next_bucket_count(4294967291), Some(4294967291));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_growth_past_table() {
        let count = next_bucket_count(4294967292).expect("64-bit targets can grow past the table");
        assert!(count >= 2 * 4294967291 + 1);
        assert!(is_prime(count));
    }

    #[test]
    fn test_is_prime() {
        let primes: Vec<usize> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        assert!(!is_prime(25));
        assert!(!is_prime(49));
    }
}
