/// Identifies an issued request.
///
/// Small and copyable so it can be captured by async completions and
/// compared when they resolve.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// Monotonic request numbering with a "latest wins" rule.
///
/// Completions carry the id they were issued with; anything that is not the
/// latest issued id is stale and must be discarded.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    next: u64,
    latest: Option<RequestId>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> RequestId {
        self.next += 1;
        let id = RequestId(self.next);
        self.latest = Some(id);
        id
    }

    pub fn is_latest(&self, id: RequestId) -> bool {
        self.latest == Some(id)
    }

    pub fn latest(&self) -> Option<RequestId> {
        self.latest
    }

    /// Make every outstanding id stale without issuing a new one.
    pub fn invalidate(&mut self) {
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{RequestId, RequestSequencer};

    #[test]
    fn ids_are_monotonic() {
        let mut seq = RequestSequencer::new();
        let a = seq.issue();
        let b = seq.issue();
        assert!(b > a);
        assert_eq!(a, RequestId(1));
    }

    #[test]
    fn only_latest_is_current() {
        let mut seq = RequestSequencer::new();
        let a = seq.issue();
        assert!(seq.is_latest(a));
        let b = seq.issue();
        assert!(!seq.is_latest(a));
        assert!(seq.is_latest(b));
    }

    #[test]
    fn invalidate_makes_everything_stale() {
        let mut seq = RequestSequencer::new();
        let a = seq.issue();
        seq.invalidate();
        assert!(!seq.is_latest(a));
        assert_eq!(seq.latest(), None);
        assert_eq!(seq.issue(), RequestId(2));
    }
}
