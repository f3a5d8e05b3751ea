use std::collections::VecDeque;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::sentiment::Sentiment;

/// Maximum number of retained entries
pub const LEDGER_CAPACITY: usize = 1000;

/// A single accepted mood entry. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct MoodEntry {
    pub id: String,
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// One page of entries, most recent first
#[derive(Debug)]
pub struct MoodPage {
    pub items: Vec<MoodEntry>,
    pub total: usize,
}

/// Bounded, append-only, insertion-ordered store of mood entries.
///
/// Append and trim happen under one write lock, so readers never observe
/// more than `capacity` entries or a partially trimmed sequence.
pub struct MoodLedger {
    entries: RwLock<VecDeque<MoodEntry>>,
    capacity: usize,
}

impl MoodLedger {
    pub fn new() -> Self {
        Self::with_capacity(LEDGER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// Append a new entry, assigning a fresh id and timestamp, and evict
    /// the oldest entries if the ledger is over capacity.
    pub fn append(
        &self,
        text: String,
        sentiment: Sentiment,
        confidence: f64,
    ) -> Result<MoodEntry, ApiError> {
        let entry = MoodEntry {
            id: Uuid::new_v4().to_string(),
            text,
            sentiment,
            confidence,
            created_at: Utc::now(),
        };

        let mut entries = self
            .entries
            .write()
            .map_err(|_| ApiError::internal("mood ledger lock poisoned"))?;

        entries.push_back(entry.clone());
        while entries.len() > self.capacity {
            entries.pop_front();
        }

        Ok(entry)
    }

    /// Read a page of entries in most-recent-first order.
    ///
    /// `total` is the ledger's current size, not the page size. A zero
    /// limit or an offset past the end yields an empty page.
    pub fn page(&self, limit: usize, offset: usize) -> Result<MoodPage, ApiError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ApiError::internal("mood ledger lock poisoned"))?;

        let items = entries
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(MoodPage {
            items,
            total: entries.len(),
        })
    }

    pub fn len(&self) -> Result<usize, ApiError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ApiError::internal("mood ledger lock poisoned"))?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, ApiError> {
        Ok(self.len()? == 0)
    }
}

impl Default for MoodLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(ledger: &MoodLedger, n: usize) {
        for i in 0..n {
            ledger
                .append(format!("entry {}", i), Sentiment::Positive, 0.9)
                .unwrap();
        }
    }

    #[test]
    fn test_append_assigns_unique_ids() {
        let ledger = MoodLedger::new();
        let a = ledger.append("one".into(), Sentiment::Positive, 0.9).unwrap();
        let b = ledger.append("two".into(), Sentiment::Negative, 0.4).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_trims_oldest_when_over_capacity() {
        let ledger = MoodLedger::with_capacity(5);
        fill(&ledger, 8);

        assert_eq!(ledger.len().unwrap(), 5);

        // the retained entries are exactly the most recent five,
        // reported most-recent-first
        let page = ledger.page(5, 0).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items[0].text, "entry 7");
        assert_eq!(page.items[4].text, "entry 3");
    }

    #[test]
    fn test_size_never_exceeds_capacity_during_appends() {
        let ledger = MoodLedger::with_capacity(3);
        for i in 0..10 {
            ledger
                .append(format!("entry {}", i), Sentiment::Positive, 0.9)
                .unwrap();
            assert!(ledger.len().unwrap() <= 3);
        }
    }

    #[test]
    fn test_page_is_most_recent_first() {
        let ledger = MoodLedger::new();
        fill(&ledger, 3);

        let page = ledger.page(50, 0).unwrap();
        let texts: Vec<&str> = page.items.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["entry 2", "entry 1", "entry 0"]);
    }

    #[test]
    fn test_zero_limit_yields_empty_page_with_total() {
        let ledger = MoodLedger::new();
        fill(&ledger, 4);

        let page = ledger.page(0, 0).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 4);
    }

    #[test]
    fn test_offset_past_end_yields_empty_page() {
        let ledger = MoodLedger::new();
        fill(&ledger, 2);

        let page = ledger.page(50, 2).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
    }

    #[test]
    fn test_offset_and_limit_slice_the_middle() {
        let ledger = MoodLedger::new();
        fill(&ledger, 5);

        let page = ledger.page(2, 1).unwrap();
        let texts: Vec<&str> = page.items.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["entry 3", "entry 2"]);
        assert_eq!(page.total, 5);
    }

    #[test]
    fn test_empty_ledger_pages_cleanly() {
        let ledger = MoodLedger::new();
        let page = ledger.page(50, 0).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert!(ledger.is_empty().unwrap());
    }
}
