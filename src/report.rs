//! Post-join summary of the store and participant outcomes

use serde::Serialize;
use std::fmt;

use crate::harness::Tally;
use crate::store::Store;

/// Final state read once after every participant has been joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Entry count at the time of the report
    pub len: usize,
    /// Present keys, sorted for stable output. Store order carries no meaning.
    pub keys: Vec<String>,
    pub sets: usize,
    /// Reads that found their key
    pub hits: usize,
    /// Reads that found nothing
    pub misses: usize,
    pub deletes: usize,
    pub skipped: usize,
}

impl Report {
    /// Read `len` and then `keys` from `store` and attach the joined `tally`.
    ///
    /// Callers must have joined all writers and deleters first.
    pub fn collect(store: &Store, tally: &Tally) -> Self {
        let len = store.len();
        let mut keys = store.keys();
        keys.sort_unstable();

        Self {
            len,
            keys,
            sets: tally.sets,
            hits: tally.hits,
            misses: tally.misses,
            deletes: tally.deletes,
            skipped: tally.skipped,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final element count: {}", self.len)?;
        writeln!(f, "All keys: [{}]", self.keys.join(", "))?;
        write!(
            f,
            "Outcomes: {} set, {} hit, {} miss, {} deleted, {} skipped",
            self.sets, self.hits, self.misses, self.deletes, self.skipped
        )
    }
}
