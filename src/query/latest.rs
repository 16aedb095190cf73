use std::fmt::Debug;

/// Handle for one issued request: a monotonic sequence number plus the request key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    seq: u64,
    key: K,
}

impl<K> Ticket<K> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn key(&self) -> &K {
        &self.key
    }
}

/// Latest-wins bookkeeping for requests that may complete out of order.
///
/// Only the most recently issued ticket may apply its response; anything older
/// is stale and must be dropped, whatever order the responses arrive in.
#[derive(Debug)]
pub struct RequestTracker<K> {
    next_seq: u64,
    latest: Option<Ticket<K>>,
    settled: bool,
}

impl<K> Default for RequestTracker<K> {
    fn default() -> Self {
        Self {
            next_seq: 1,
            latest: None,
            settled: true,
        }
    }
}

impl<K: Clone + PartialEq + Debug> RequestTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, key: K) -> Ticket<K> {
        let ticket = Ticket {
            seq: self.next_seq,
            key,
        };
        self.next_seq += 1;
        self.latest = Some(ticket.clone());
        self.settled = false;
        tracing::debug!(seq = ticket.seq, key = ?ticket.key, "request issued");
        ticket
    }

    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        self.latest.as_ref() == Some(ticket)
    }

    /// Returns whether the response for `ticket` may be applied, and settles the
    /// latest request when it does.
    pub fn accept(&mut self, ticket: &Ticket<K>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(seq = ticket.seq, "dropping stale response");
            return false;
        }
        if self.settled {
            return false;
        }
        self.settled = true;
        true
    }

    /// True while the latest issued request has not been accepted yet.
    pub fn in_flight(&self) -> bool {
        !self.settled
    }

    pub fn latest_key(&self) -> Option<&K> {
        self.latest.as_ref().map(|t| &t.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_order_responses_only_apply_latest() {
        let mut tracker = RequestTracker::new();
        let first = tracker.issue("page=1");
        let second = tracker.issue("page=2");
        assert!(second.seq() > first.seq());
        assert!(tracker.in_flight());

        // Newer response arrives first and wins.
        assert!(tracker.accept(&second));
        assert!(!tracker.in_flight());
        // Superseded response arriving late is dropped.
        assert!(!tracker.accept(&first));
        assert_eq!(tracker.latest_key(), Some(&"page=2"));
    }

    #[test]
    fn stale_response_is_dropped_while_latest_pending() {
        let mut tracker = RequestTracker::new();
        let a = tracker.issue(1);
        let b = tracker.issue(2);
        assert!(!tracker.accept(&a));
        assert!(tracker.in_flight());
        assert!(tracker.accept(&b));
    }

    #[test]
    fn same_key_reissued_gets_a_new_sequence() {
        let mut tracker = RequestTracker::new();
        let a = tracker.issue("same");
        let b = tracker.issue("same");
        assert_ne!(a, b);
        assert!(!tracker.accept(&a));
        assert!(tracker.accept(&b));
        // A ticket is applied at most once.
        assert!(!tracker.accept(&b));
    }
}
