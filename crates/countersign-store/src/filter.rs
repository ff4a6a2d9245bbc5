//! Audit record filtering for forensic queries.

use countersign_canonical::UserId;
use countersign_core::AuditEntry;
use countersign_journal::AuditRecord;

use crate::audit::AuditReader;
use crate::error::StoreError;

/// Predicate over audit entries.
pub trait AuditFilter {
    /// Returns true if the entry matches.
    fn matches(&self, entry: &AuditEntry) -> bool;
}

impl<F: AuditFilter + ?Sized> AuditFilter for Box<F> {
    fn matches(&self, entry: &AuditEntry) -> bool {
        (**self).matches(entry)
    }
}

/// Entries for one user.
#[derive(Debug, Clone)]
pub struct UserFilter {
    /// User to match.
    pub user_id: UserId,
}

impl AuditFilter for UserFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        entry.user_id.as_ref() == Some(&self.user_id)
    }
}

/// Entries with one action.
#[derive(Debug, Clone)]
pub struct ActionFilter {
    /// Action name to match.
    pub action: String,
}

impl AuditFilter for ActionFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        entry.action == self.action
    }
}

/// Entries within a time range (epoch milliseconds, both ends inclusive).
#[derive(Debug, Clone, Default)]
pub struct TimeRangeFilter {
    /// Earliest timestamp.
    pub after: Option<i64>,
    /// Latest timestamp.
    pub before: Option<i64>,
}

impl AuditFilter for TimeRangeFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        self.after.map_or(true, |after| entry.timestamp >= after)
            && self.before.map_or(true, |before| entry.timestamp <= before)
    }
}

/// All filters must match. An empty list matches everything.
#[derive(Default)]
pub struct AndFilter {
    /// Filters to combine.
    pub filters: Vec<Box<dyn AuditFilter>>,
}

impl AuditFilter for AndFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        self.filters.iter().all(|f| f.matches(entry))
    }
}

/// Any filter must match. An empty list matches nothing.
#[derive(Default)]
pub struct OrFilter {
    /// Filters to combine.
    pub filters: Vec<Box<dyn AuditFilter>>,
}

impl AuditFilter for OrFilter {
    fn matches(&self, entry: &AuditEntry) -> bool {
        self.filters.iter().any(|f| f.matches(entry))
    }
}

/// Reader that yields only records whose entry matches a filter.
pub struct FilteredReader<R: AuditReader, F: AuditFilter> {
    reader: R,
    filter: F,
}

impl<R: AuditReader, F: AuditFilter> FilteredReader<R, F> {
    /// Wraps `reader`.
    pub fn new(reader: R, filter: F) -> Self {
        Self { reader, filter }
    }
}

impl<R: AuditReader, F: AuditFilter> AuditReader for FilteredReader<R, F> {
    fn read_next(&mut self) -> Result<Option<AuditRecord>, StoreError> {
        loop {
            match self.reader.read_next()? {
                None => return Ok(None),
                Some(record) if self.filter.matches(&record.entry) => return Ok(Some(record)),
                Some(_) => continue,
            }
        }
    }
}
