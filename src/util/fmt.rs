use std::cell::Cell;
use std::fmt::{self, Debug, Formatter};

/// Formats an iterator as a list without collecting it first. The iterator is consumed by the
/// first call to [`Debug::fmt`]; later calls print an empty list.
pub struct DebugIter<I>(Cell<Option<I>>);

impl<I> DebugIter<I> {
    pub const fn new(iter: I) -> DebugIter<I> {
        DebugIter(Cell::new(Some(iter)))
    }
}

impl<I> Debug for DebugIter<I>
where
    I: Iterator,
    I::Item: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0.take() {
            Some(iter) => f.debug_list().entries(iter).finish(),
            None => f.debug_list().finish(),
        }
    }
}
