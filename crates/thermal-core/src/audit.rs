//! Append-only audit log of user actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of entries kept in memory
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Info,
    Warning,
    Error,
}

/// One audited action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// `None` for anonymous or system actions
    pub actor: Option<String>,
    pub action: String,
    pub status: LogStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded in-memory audit log; the oldest entries are evicted first
#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    pub async fn record(
        &self,
        actor: Option<&str>,
        action: impl Into<String>,
        status: LogStatus,
        message: impl Into<String>,
    ) {
        let entry = LogEntry {
            actor: actor.filter(|a| !a.is_empty()).map(String::from),
            action: action.into(),
            status,
            message: message.into(),
            timestamp: Utc::now(),
        };
        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent entries first, at most `limit`
    pub async fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
