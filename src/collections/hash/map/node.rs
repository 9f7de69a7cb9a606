use std::ptr::NonNull;

pub(crate) type Link<K, V> = Option<NodeRef<K, V>>;

/// A node of the chain threaded through every entry of a map. The hash is cached so that rehashing
/// never calls the hasher.
pub(crate) struct Node<K, V> {
    pub next: Link<K, V>,
    pub hash: u64,
    pub key: K,
    pub value: V,
}

/// A copyable pointer to a live [`Node`]. The accessors hand out references with unbounded
/// lifetimes, the map that owns the node decides how long they may be used.
#[derive(Debug)]
pub(crate) struct NodeRef<K, V>(pub NonNull<Node<K, V>>);

impl<K, V> NodeRef<K, V> {
    pub const fn hash(self) -> u64 {
        // SAFETY: NodeRefs always point to live nodes.
        unsafe { (*self.0.as_ptr()).hash }
    }

    pub const fn key<'a>(self) -> &'a K {
        // SAFETY: As above, keys are never handed out mutably.
        unsafe { &(*self.0.as_ptr()).key }
    }

    pub const fn value<'a>(self) -> &'a V {
        // SAFETY: As above.
        unsafe { &(*self.0.as_ptr()).value }
    }

    pub const fn value_mut<'a>(self) -> &'a mut V {
        // SAFETY: As above, the caller holds the map mutably.
        unsafe { &mut (*self.0.as_ptr()).value }
    }

    pub const fn entry<'a>(self) -> (&'a K, &'a V) {
        (self.key(), self.value())
    }

    pub const fn entry_mut<'a>(self) -> (&'a K, &'a mut V) {
        (self.key(), self.value_mut())
    }

    pub const fn next(self) -> Link<K, V> {
        // SAFETY: As above.
        unsafe { (*self.0.as_ptr()).next }
    }

    #[allow(clippy::mut_from_ref)]
    pub const fn next_mut<'a>(&self) -> &'a mut Link<K, V> {
        // SAFETY: As above, the caller holds the map mutably.
        unsafe { &mut (*self.0.as_ptr()).next }
    }
}

impl<K, V> Clone for NodeRef<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeRef<K, V> {}

impl<K, V> PartialEq for NodeRef<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<K, V> Eq for NodeRef<K, V> {}

/// The link that comes right before a node in the chain: either the map's head pointer or the
/// `next` field of another node.
#[derive(Debug)]
pub(crate) enum Prev<K, V> {
    Head,
    Node(NodeRef<K, V>),
}

impl<K, V> Clone for Prev<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Prev<K, V> {}

impl<K, V> PartialEq for Prev<K, V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Prev::Head, Prev::Head) => true,
            (Prev::Node(a), Prev::Node(b)) => a == b,
            _ => false,
        }
    }
}

/// A bucket stores the link before its first node, so that the first node can be unlinked without
/// a search. Empty buckets are [`None`].
pub(crate) type Bucket<K, V> = Option<Prev<K, V>>;
