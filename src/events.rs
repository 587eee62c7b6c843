//! Live snapshot publication.
//!
//! The engine pushes a [`LiveSnapshot`] after every state change; dashboards
//! subscribe and receive them on their own channel.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};

/// Current tracking state as seen by presentation code.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LiveSnapshot {
    pub session_id: Option<i64>,
    /// Session-relative steps
    pub steps: u64,
    pub distance_meters: f64,
    pub duration_seconds: u64,
    /// Seconds per kilometre, None until distance and duration are both positive
    pub pace_seconds_per_km: Option<f64>,
    pub is_active: bool,
}

impl LiveSnapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Fan-out of snapshots to any number of subscribers.
#[derive(Default)]
pub struct SnapshotBus {
    subscribers: Vec<mpsc::Sender<LiveSnapshot>>,
    last: Option<LiveSnapshot>,
}

impl SnapshotBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. The latest snapshot, if any, is delivered immediately.
    pub fn subscribe(&mut self) -> mpsc::Receiver<LiveSnapshot> {
        let (tx, rx) = mpsc::channel();
        if let Some(last) = &self.last {
            // Receiver is alive, this cannot fail
            let _ = tx.send(last.clone());
        }
        self.subscribers.push(tx);
        rx
    }

    /// Deliver a snapshot to all subscribers, forgetting those that hung up.
    pub fn publish(&mut self, snapshot: LiveSnapshot) {
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
        self.last = Some(snapshot);
    }

    pub fn latest(&self) -> Option<&LiveSnapshot> {
        self.last.as_ref()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
