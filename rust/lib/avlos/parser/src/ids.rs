//! Run-scoped identity assignment.

/// Monotonic counter handing out dense ids from 0.
///
/// Not `Clone`: each deserialization call creates and owns exactly one
/// allocator, and it is dropped with the call.
#[derive(Debug)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Return the current id and advance.
    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// How many ids have been handed out so far.
    pub fn issued(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_from_zero() {
        let mut ids = IdAllocator::new();
        let got: Vec<u32> = (0..4).map(|_| ids.next()).collect();
        assert_eq!(got, [0, 1, 2, 3]);
        assert_eq!(ids.issued(), 4);
    }

    #[test]
    fn fresh_allocators_are_independent() {
        let mut a = IdAllocator::new();
        a.next();
        a.next();
        let mut b = IdAllocator::new();
        assert_eq!(b.next(), 0);
        assert_eq!(a.next(), 2);
    }
}
