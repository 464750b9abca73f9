//! Ordered lock protocol for two-account operations.
//!
//! Any operation that touches two accounts must take its row locks in
//! ascending identifier order, never in caller order. Two concurrent
//! transfers in opposite directions then both request the lower id first,
//! so neither can hold one lock while waiting on the other.

/// Two accounts in lock-acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOrder<T> {
    /// Locked first.
    pub first: T,
    /// Locked second.
    pub second: T,
}

impl<T: Ord + Copy> LockOrder<T> {
    /// Orders a sender/receiver pair for locking.
    #[must_use]
    pub fn for_pair(sender: T, receiver: T) -> Self {
        let (first, second) = ordered_pair(sender, receiver);
        Self { first, second }
    }

    /// Returns the ids in acquisition order.
    #[must_use]
    pub fn as_array(&self) -> [T; 2] {
        [self.first, self.second]
    }
}

/// Returns `(low, high)` under the total order of `T`.
#[must_use]
pub fn ordered_pair<T: Ord>(a: T, b: T) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}
