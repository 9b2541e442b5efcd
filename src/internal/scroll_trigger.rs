use tracing::debug;

use crate::internal::accumulator::{PageAccumulator, PageRequest};

/// Identity of the sentinel node that sits after the list tail. A new tail
/// (after a merge) or a new query produces a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SentinelKey {
    pub generation: u64,
    pub tail_id: Option<String>,
}

impl SentinelKey {
    pub fn for_accumulator(acc: &PageAccumulator) -> Self {
        Self {
            generation: acc.generation(),
            tail_id: acc.tail().map(|entry| entry.id.clone()),
        }
    }
}

/// Visibility change reported by the UI for an observed sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntersectionEvent {
    pub sentinel: SentinelKey,
    pub is_intersecting: bool,
}

/// Turns sentinel visibility into `load_more` calls.
///
/// At most one sentinel is observed at a time. An intersection fires once;
/// the trigger re-arms when the sentinel leaves the viewport or when it is
/// re-bound to a new tail. Events for a sentinel that is no longer observed
/// are ignored.
#[derive(Debug, Default)]
pub struct ScrollTrigger {
    observed: Option<SentinelKey>,
    armed: bool,
}

impl ScrollTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the sentinel after the accumulator's current tail. Re-binding to
    /// the same sentinel keeps the current arming state.
    ///
    /// Returns `true` when the observed sentinel changed.
    pub fn rebind(&mut self, acc: &PageAccumulator) -> bool {
        let key = SentinelKey::for_accumulator(acc);
        if self.observed.as_ref() == Some(&key) {
            return false;
        }
        debug!(
            generation = key.generation,
            tail = ?key.tail_id,
            "Sentinel re-bound"
        );
        self.observed = Some(key);
        self.armed = true;
        true
    }

    /// Stop observing (view unmounted or query changed).
    pub fn release(&mut self) {
        if self.observed.take().is_some() {
            debug!("Sentinel released");
        }
        self.armed = false;
    }

    pub fn observed(&self) -> Option<&SentinelKey> {
        self.observed.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Handle a visibility change and, when it warrants one, ask the
    /// accumulator for the next page.
    pub fn on_intersection(
        &mut self,
        event: &IntersectionEvent,
        acc: &mut PageAccumulator,
    ) -> Option<PageRequest> {
        if self.observed.as_ref() != Some(&event.sentinel) {
            debug!(sentinel = ?event.sentinel, "Ignoring event for unobserved sentinel");
            return None;
        }

        if !event.is_intersecting {
            self.armed = true;
            return None;
        }

        if !self.armed || acc.is_exhausted() || acc.is_in_flight() {
            return None;
        }

        self.armed = false;
        acc.load_more()
    }
}
