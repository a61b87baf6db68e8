//! Request log and pending-call ledger
//!
//! Each call gets a reference id from an atomic counter. The entry is written
//! when the call starts and completed when it returns. While in flight, the
//! reference is also registered under its operation name. Past its capacity
//! the log drops its oldest entries.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

/// One logged call
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
    pub reference: u64,
    pub name: String,
    pub method: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// `None` while the call is in flight, `-1` on a transport failure
    pub status: Option<i32>,
    pub elapsed_ms: Option<u64>,
    #[serde(skip)]
    pub started_at: Instant,
}

impl RequestLogEntry {
    pub fn is_finished(&self) -> bool {
        self.status.is_some()
    }
}

/// Entries kept by a log built with `RequestLog::new`
pub const DEFAULT_LOG_CAPACITY: usize = 1_000;

/// Shared request log
#[derive(Debug)]
pub struct RequestLog {
    counter: AtomicU64,
    /// Maximum number of entries kept (0 = unlimited)
    capacity: usize,
    entries: Mutex<BTreeMap<u64, RequestLogEntry>>,
    pending: Mutex<HashMap<String, BTreeSet<u64>>>,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counter: AtomicU64::new(0),
            capacity,
            entries: Mutex::new(BTreeMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record the start of a call and return its reference id
    pub fn start(
        &self,
        name: &str,
        method: &str,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
        body: Option<&Value>,
    ) -> u64 {
        let reference = self.counter.fetch_add(1, Ordering::SeqCst) + 1;

        let entry = RequestLogEntry {
            reference,
            name: name.to_string(),
            method: method.to_string(),
            url: url.to_string(),
            query: query.to_vec(),
            headers: headers.to_vec(),
            body: body.cloned(),
            status: None,
            elapsed_ms: None,
            started_at: Instant::now(),
        };

        let mut entries = self.entries.lock();
        let mut pending = self.pending.lock();
        entries.insert(reference, entry);
        pending.entry(name.to_string()).or_default().insert(reference);

        while self.capacity > 0 && entries.len() > self.capacity {
            let Some((oldest, evicted)) = entries.pop_first() else {
                break;
            };
            forget_pending(&mut pending, &evicted.name, oldest);
        }

        reference
    }

    /// Complete a call. `status` is `-1` when no response was received.
    pub fn finish(&self, reference: u64, status: i32) -> Option<u64> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(&reference)?;

        let elapsed = entry.started_at.elapsed().as_millis() as u64;
        entry.status = Some(status);
        entry.elapsed_ms = Some(elapsed);

        forget_pending(&mut self.pending.lock(), &entry.name, reference);

        Some(elapsed)
    }

    pub fn entries(&self) -> Vec<RequestLogEntry> {
        self.entries.lock().values().cloned().collect()
    }

    pub fn entry(&self, reference: u64) -> Option<RequestLogEntry> {
        self.entries.lock().get(&reference).cloned()
    }

    /// References still in flight for an operation name
    pub fn pending(&self, name: &str) -> Vec<u64> {
        self.pending
            .lock()
            .get(name)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn pending_total(&self) -> usize {
        self.pending.lock().values().map(BTreeSet::len).sum()
    }

    /// Drop every entry. The counter keeps running.
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.pending.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn forget_pending(pending: &mut HashMap<String, BTreeSet<u64>>, name: &str, reference: u64) {
    if let Some(set) = pending.get_mut(name) {
        set.remove(&reference);
        if set.is_empty() {
            pending.remove(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references_increase_and_pending_is_cleared() {
        let log = RequestLog::new();
        let first = log.start("users.index", "GET", "http://api/users", &[], &[], None);
        let second = log.start("users.index", "GET", "http://api/users", &[], &[], None);

        assert_eq!(first + 1, second);
        assert_eq!(log.pending("users.index"), vec![first, second]);

        log.finish(first, 200);
        assert_eq!(log.pending("users.index"), vec![second]);

        log.finish(second, -1);
        assert!(log.pending("users.index").is_empty());
        assert_eq!(log.pending_total(), 0);
        assert_eq!(log.entry(second).and_then(|e| e.status), Some(-1));
    }

    #[test]
    fn test_clear_keeps_counter() {
        let log = RequestLog::new();
        let first = log.start("a", "GET", "u", &[], &[], None);
        log.clear();
        assert!(log.is_empty());

        let next = log.start("a", "GET", "u", &[], &[], None);
        assert!(next > first);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_finish_unknown_reference() {
        let log = RequestLog::new();
        assert_eq!(log.finish(42, 200), None);
    }

    #[test]
    fn test_capacity_drops_oldest_entries() {
        let log = RequestLog::with_capacity(3);
        let references: Vec<u64> = (0..10)
            .map(|_| log.start("users.index", "GET", "u", &[], &[], None))
            .collect();

        assert_eq!(log.len(), 3);
        let kept: Vec<u64> = log.entries().iter().map(|e| e.reference).collect();
        assert_eq!(kept, references[7..].to_vec());

        // Evicted calls leave the pending ledger too
        assert_eq!(log.pending("users.index"), references[7..].to_vec());
        assert_eq!(log.finish(references[0], 200), None);
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let log = RequestLog::with_capacity(0);
        for _ in 0..50 {
            let reference = log.start("a", "GET", "u", &[], &[], None);
            log.finish(reference, 200);
        }
        assert_eq!(log.len(), 50);
        assert_eq!(RequestLog::new().capacity(), DEFAULT_LOG_CAPACITY);
    }
}
