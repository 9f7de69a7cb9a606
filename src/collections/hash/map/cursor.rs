use super::node::{Link, Prev};
use super::HashMap;
use crate::memory::Allocator;

/// A cursor over the chain of a [`HashMap`], which can remove the entry it points at.
///
/// The cursor visits entries in the same order as [`HashMap::iter`]. Once it moves past the last
/// entry it points at nothing, and [`current`](CursorMut::current) returns [`None`].
///
/// See [`HashMap::cursor_front_mut`] and [`HashMap::cursor_at_mut`].
pub struct CursorMut<'a, K, V, H, E, A: Allocator> {
    pub(crate) map: &'a mut HashMap<K, V, H, E, A>,
    pub(crate) prev: Prev<K, V>,
    pub(crate) current: Link<K, V>,
}

impl<K, V, H, E, A: Allocator> CursorMut<'_, K, V, H, E, A> {
    /// Returns the entry the cursor points at.
    pub const fn current(&self) -> Option<(&K, &V)> {
        match self.current {
            Some(node) => Some(node.entry()),
            None => None,
        }
    }

    /// Returns the entry the cursor points at, with a mutable value.
    pub const fn current_mut(&mut self) -> Option<(&K, &mut V)> {
        match self.current {
            Some(node) => Some(node.entry_mut()),
            None => None,
        }
    }

    /// Returns the entry after the one the cursor points at.
    pub const fn peek_next(&self) -> Option<(&K, &V)> {
        match self.current {
            Some(node) => match node.next() {
                Some(next) => Some(next.entry()),
                None => None,
            },
            None => None,
        }
    }

    /// Moves the cursor to the next entry. Does nothing past the last entry.
    pub const fn move_next(&mut self) -> &mut Self {
        if let Some(node) = self.current {
            self.prev = Prev::Node(node);
            self.current = node.next();
        }
        self
    }

    /// Removes the entry the cursor points at and returns it, leaving the cursor at the entry that
    /// followed it.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        let node = self.current?;
        self.current = node.next();
        Some(self.map.remove_node(self.prev, node))
    }

    /// Returns the number of entries left in the HashMap.
    pub const fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the HashMap has no entries left.
    pub const fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
