/// Comparison of handles by the group that owns their object, rather than by the address they
/// expose.
///
/// Two handles have the same owner if they share a control block, which holds even if one of them
/// aliases a different address (see [`SharedHandle::map`](super::SharedHandle::map)) or is weak.
/// Empty handles share the null owner. The order is total but otherwise arbitrary, which makes it
/// suitable as a key for ordered containers.
pub trait Ownership {
    /// Returns the address of the control block, or null for an empty handle.
    fn owner_ptr(&self) -> *const ();

    /// Returns true if this handle's owner comes before `other`'s in the owner order.
    fn owner_before<O: Ownership + ?Sized>(&self, other: &O) -> bool {
        self.owner_ptr().addr() < other.owner_ptr().addr()
    }

    /// Returns true if both handles share the same owner.
    fn owner_eq<O: Ownership + ?Sized>(&self, other: &O) -> bool {
        self.owner_ptr() == other.owner_ptr()
    }
}
