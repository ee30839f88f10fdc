//! Three slot value register with change detection.
//!
//! A [`Value`] keeps the value most recently applied (`curr`), the one applied
//! before it (`prev`), and the `target` that was asked for. The target is kept
//! separately because the applied value is usually a corrected version of it.

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A `prev`/`curr`/`target` register.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Value<T> {
    prev: T,
    curr: T,
    target: T,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> Value<T>
where
    T: Copy + PartialEq,
{
    /// Create a register with all three slots set to `init`.
    pub fn new(init: T) -> Self {
        Self {
            prev: init,
            curr: init,
            target: init,
        }
    }

    /// The current value.
    pub fn get(&self) -> T {
        self.curr
    }

    /// The value before the last update.
    pub fn prev(&self) -> T {
        self.prev
    }

    /// The requested value.
    pub fn target(&self) -> T {
        self.target
    }

    /// Set the requested value, leaving the current one untouched.
    pub fn set_target(&mut self, target: T) {
        self.target = target;
    }

    /// Shift `curr` into `prev` and store `new_val` as `curr`.
    ///
    /// Returns the `prev` value being overwritten.
    pub fn update(&mut self, new_val: T) -> T {
        let p = self.prev;
        self.prev = self.curr;
        self.curr = new_val;
        p
    }

    /// True if the last update actually changed the value.
    pub fn changed(&self) -> bool {
        self.prev != self.curr
    }

    /// True if applying `candidate` would change the current value.
    pub fn differs(&self, candidate: T) -> bool {
        self.curr != candidate
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_update_shifts_slots() {
        let mut v = Value::new(0i32);
        assert_eq!(v.update(5), 0);
        assert_eq!(v.get(), 5);
        assert_eq!(v.prev(), 0);
        assert!(v.changed());

        assert_eq!(v.update(5), 0);
        assert_eq!(v.prev(), 5);
        assert!(!v.changed());

        assert_eq!(v.update(8), 5);
        assert_eq!(v.get(), 8);
    }

    #[test]
    fn test_target_is_separate() {
        let mut v = Value::new(0i32);
        v.set_target(10);
        assert_eq!(v.target(), 10);
        assert_eq!(v.get(), 0);
        assert!(v.differs(10));
        assert!(!v.differs(0));
    }
}
