//! Single-slot mailbox: the producer/consumer bridge used everywhere a
//! "latest value wins" handoff is needed (assembler → decoder, decoder →
//! presenter). Holds at most one value; `put` replaces and releases the
//! prior value; there is no queue, deliberately, to keep latency bounded.

use std::sync::Mutex;

pub struct SingleSlotMailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> SingleSlotMailbox<T> {
    pub fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    /// Replaces whatever value was present. The prior value, if any, is
    /// dropped here.
    pub fn put(&self, value: T) {
        let mut slot = self.slot.lock().unwrap();
        *slot = Some(value);
    }

    /// Takes the current value, if any, clearing readiness.
    pub fn take(&self) -> Option<T> {
        let mut slot = self.slot.lock().unwrap();
        slot.take()
    }

    pub fn has_value(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

impl<T> Default for SingleSlotMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_take_round_trips() {
        let mailbox = SingleSlotMailbox::new();
        mailbox.put(42);
        assert!(mailbox.has_value());
        assert_eq!(mailbox.take(), Some(42));
        assert!(!mailbox.has_value());
    }

    #[test]
    fn put_replaces_prior_value() {
        let mailbox = SingleSlotMailbox::new();
        mailbox.put("first");
        mailbox.put("second");
        assert_eq!(mailbox.take(), Some("second"));
        assert_eq!(mailbox.take(), None);
    }
}
