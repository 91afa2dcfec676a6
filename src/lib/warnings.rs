//! The warning deduplication ledger (`spec.md` §4.4, §3 "WarningEntry").
//! A concurrent map keyed by an opaque message-id, enforcing the fixed
//! repeat-suppression window on its own — not via the manager mutex, per
//! `spec.md` §5's "the warning ledger is a concurrent map; atomic
//! check-then-insert is enforced by the ledger's own operations".

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::target::Mmsi;

/// Suppression window for repeated issuance of the same message-id.
pub const WARNING_REPEAT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

struct WarningEntry {
    text: String,
    issued_at: Instant,
}

/// A callback invoked for every incoming safety-related message and every
/// internally generated broadcast, per `spec.md` §6 (`onMessage(received,
/// sourceMmsi, destinationMmsi, text)`).
pub trait MessageObserver: Send + Sync {
    fn on_message(&self, received: bool, source_mmsi: Mmsi, destination_mmsi: Mmsi, text: &str);
}

/// A callback invoked for each outbound sentence the codec produces from
/// an internally built AIS message (`spec.md` §6, "outbound sentence
/// events").
pub trait OutboundSentenceObserver: Send + Sync {
    fn on_outbound_sentence(&self, sentence: &str);
}

pub struct WarningLedger {
    entries: Mutex<HashMap<String, WarningEntry>>,
}

impl WarningLedger {
    pub fn new() -> Self {
        WarningLedger {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the warning was newly issued (and should be
    /// broadcast by the caller), `false` if suppressed as a repeat within
    /// [`WARNING_REPEAT_TIMEOUT`]. The check-then-insert happens under a
    /// single lock acquisition so concurrent callers with the same
    /// `message_id` can't both observe "not suppressed".
    pub fn try_issue(&self, message_id: &str, text: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(message_id) {
            if existing.issued_at + WARNING_REPEAT_TIMEOUT > now {
                return false;
            }
        }
        entries.insert(
            message_id.to_string(),
            WarningEntry {
                text: text.to_string(),
                issued_at: now,
            },
        );
        true
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WarningLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_issuance_always_succeeds() {
        let ledger = WarningLedger::new();
        assert!(ledger.try_issue("X", "a", Instant::now()));
    }

    #[test]
    fn repeat_within_window_is_suppressed() {
        let ledger = WarningLedger::new();
        let t0 = Instant::now();
        assert!(ledger.try_issue("X", "a", t0));
        assert!(!ledger.try_issue("X", "a", t0 + Duration::from_secs(5 * 60)));
    }

    #[test]
    fn repeat_after_window_succeeds() {
        let ledger = WarningLedger::new();
        let t0 = Instant::now();
        assert!(ledger.try_issue("X", "a", t0));
        assert!(ledger.try_issue("X", "a", t0 + Duration::from_secs(11 * 60)));
    }

    #[test]
    fn clear_empties_ledger() {
        let ledger = WarningLedger::new();
        ledger.try_issue("X", "a", Instant::now());
        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn distinct_message_ids_are_independent() {
        let ledger = WarningLedger::new();
        let now = Instant::now();
        assert!(ledger.try_issue("A", "a", now));
        assert!(ledger.try_issue("B", "b", now));
        assert_eq!(ledger.len(), 2);
    }
}
