//! Request tokens for out-of-order completions
//!
//! Every issued fetch gets a monotonically increasing token. Only the
//! completion carrying the latest token of its channel is applied.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A query together with the token its completion must present
#[derive(Clone, Debug, PartialEq)]
pub struct Issued<Q> {
    pub token: RequestToken,
    pub query: Q,
}

/// Token source for one request channel
#[derive(Debug, Default)]
pub struct RequestTracker {
    issued: u64,
    latest: Option<RequestToken>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue<Q>(&mut self, query: Q) -> Issued<Q> {
        self.issued += 1;
        let token = RequestToken(self.issued);
        self.latest = Some(token);
        Issued { token, query }
    }

    /// `token` belongs to the newest outstanding request
    fn is_latest(&self, token: RequestToken) -> bool {
        self.latest == Some(token)
    }

    /// Accept a completion: true at most once per token, and only for the newest
    pub fn settle(&mut self, token: RequestToken) -> bool {
        if self.is_latest(token) {
            self.latest = None;
            true
        } else {
            false
        }
    }

    /// Make every outstanding request stale
    pub fn invalidate(&mut self) {
        self.latest = None;
    }

    pub fn in_flight(&self) -> bool {
        self.latest.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_settles() {
        let mut t = RequestTracker::new();
        let a = t.issue("a");
        let b = t.issue("b");
        assert!(a.token < b.token);
        assert!(!t.settle(a.token));
        assert!(t.settle(b.token));
        // duplicate completion
        assert!(!t.settle(b.token));
        assert!(!t.in_flight());
    }

    #[test]
    fn test_invalidate() {
        let mut t = RequestTracker::new();
        let a = t.issue(());
        t.invalidate();
        assert!(!t.settle(a.token));
        let b = t.issue(());
        assert!(t.settle(b.token));
    }
}
