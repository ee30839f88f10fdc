//! Single slot, last value wins channel between the tracker thread and the main loop.
//!
//! The sender overwrites the slot without blocking, the receiver takes whatever is there and
//! leaves the slot empty. Intermediate values are lost.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

/// Marks the slot as empty, outside the range of any `i32`.
const EMPTY: i64 = i64::MIN;

/// Writing half of a slot.
#[derive(Debug, Clone)]
pub struct SlotSender {
    slot: Arc<AtomicI64>,
}

/// Reading half of a slot.
#[derive(Debug)]
pub struct SlotReceiver {
    slot: Arc<AtomicI64>,
}

/// Create an empty slot.
pub fn slot() -> (SlotSender, SlotReceiver) {
    let slot = Arc::new(AtomicI64::new(EMPTY));
    (
        SlotSender { slot: slot.clone() },
        SlotReceiver { slot },
    )
}

impl SlotSender {
    /// Store a value, replacing any value not yet taken.
    pub fn send(&self, value: i32) {
        self.slot.store(value as i64, Ordering::Release);
    }
}

impl SlotReceiver {
    /// Take the latest value, if one was sent since the last take.
    pub fn try_recv(&self) -> Option<i32> {
        match self.slot.swap(EMPTY, Ordering::AcqRel) {
            EMPTY => None,
            v => Some(v as i32),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_last_value_wins() {
        let (tx, rx) = slot();
        assert_eq!(rx.try_recv(), None);

        tx.send(1);
        tx.send(-2);
        tx.send(3);
        assert_eq!(rx.try_recv(), Some(3));
        assert_eq!(rx.try_recv(), None);

        tx.send(i32::MIN);
        assert_eq!(rx.try_recv(), Some(i32::MIN));
    }

    #[test]
    fn test_across_threads() {
        let (tx, rx) = slot();

        std::thread::spawn(move || {
            for i in 0..1000 {
                tx.send(i);
            }
        })
        .join()
        .unwrap();

        assert_eq!(rx.try_recv(), Some(999));
    }
}
