//! Deterministic signatures of composed queries.
//!
//! Two queries get the same signature exactly when they are structurally equal,
//! so the signature can tag log lines and key caches without comparing whole
//! queries.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::models::AnalyticsQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuerySignature(u64);

impl QuerySignature {
    pub fn of(query: &AnalyticsQuery) -> Self {
        let mut hasher = DefaultHasher::new();
        query.hash(&mut hasher);
        QuerySignature(hasher.finish())
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
