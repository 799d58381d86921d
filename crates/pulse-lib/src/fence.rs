//! Request-generation fence
//!
//! Fetches from one call site may overlap and resolve out of order. Each
//! request is tagged with a sequence number; only the latest issued one is
//! allowed to mutate state when it completes.

#[derive(Debug, Default, Clone)]
pub struct RequestFence {
    issued: u64,
}

impl RequestFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new sequence number, superseding all earlier ones
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Whether `seq` is still the most recent request
    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.issued
    }

    /// Invalidate everything in flight without issuing a new request
    pub fn invalidate(&mut self) {
        self.issued += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut fence = RequestFence::new();
        let first = fence.issue();
        let second = fence.issue();
        assert!(!fence.is_current(first));
        assert!(fence.is_current(second));
    }

    #[test]
    fn test_invalidate() {
        let mut fence = RequestFence::new();
        let seq = fence.issue();
        fence.invalidate();
        assert!(!fence.is_current(seq));
    }
}
