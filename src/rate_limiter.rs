use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::error::ApiError;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

/// Per-client record for the current window
struct ClientRecord {
    count: u32,
    window_reset_at: Instant,
}

/// Per-client fixed-window admission control.
///
/// One record per client key; the record is replaced wholesale once its
/// window expires. The read-then-write for a key happens under a single
/// write lock, so concurrent requests for the same key cannot race past
/// the ceiling.
pub struct RateLimiter {
    records: RwLock<HashMap<String, ClientRecord>>,
    window: Duration,
    ceiling: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, ceiling: u32) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            window,
            ceiling,
        }
    }

    /// Admit or deny a request from `client_key`.
    ///
    /// Denied requests never increment the window counter.
    pub fn admit(&self, client_key: &str) -> Result<Admission, ApiError> {
        let now = Instant::now();
        let mut records = self
            .records
            .write()
            .map_err(|_| ApiError::internal("rate limiter lock poisoned"))?;

        match records.get_mut(client_key) {
            Some(record) if now < record.window_reset_at => {
                if record.count < self.ceiling {
                    record.count += 1;
                    Ok(Admission::Allowed {
                        remaining: self.ceiling - record.count,
                    })
                } else {
                    Ok(Admission::Denied {
                        retry_after: record.window_reset_at - now,
                    })
                }
            }
            _ => {
                records.insert(
                    client_key.to_string(),
                    ClientRecord {
                        count: 1,
                        window_reset_at: now + self.window,
                    },
                );
                Ok(Admission::Allowed {
                    remaining: self.ceiling.saturating_sub(1),
                })
            }
        }
    }

    /// Drop records whose window has expired. Returns the number removed.
    ///
    /// Purging only bounds memory; admission stays correct without it
    /// because expired records are replaced on the next admit.
    pub fn purge_expired(&self) -> Result<usize, ApiError> {
        let now = Instant::now();
        let mut records = self
            .records
            .write()
            .map_err(|_| ApiError::internal("rate limiter lock poisoned"))?;

        let before = records.len();
        records.retain(|_, record| now < record.window_reset_at);
        Ok(before - records.len())
    }

    /// Number of tracked client records
    pub fn tracked_clients(&self) -> Result<usize, ApiError> {
        let records = self
            .records
            .read()
            .map_err(|_| ApiError::internal("rate limiter lock poisoned"))?;
        Ok(records.len())
    }
}
