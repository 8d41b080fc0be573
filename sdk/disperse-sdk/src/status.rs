//! Run state published to observers.
//!
//! The engine is the single writer of a [`RunSnapshot`]; the presentation
//! layer subscribes and renders whatever snapshot is current.

use crate::core::constants::INTERMEDIATE_COUNT;
use serde::{Serialize, Serializer};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    AwaitingFunding,
    Seeding,
    Relaying,
    Done,
    Failed,
    Withdrawing,
    Withdrawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HopStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Error,
}

impl HopStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::InProgress => "🔄",
            Self::Completed => "✅",
            Self::Error => "❌",
        }
    }
}

/// Transfer position within a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Funding account -> first intermediate
    Seed,
    /// Intermediate `n` -> next intermediate, or landing for the last one
    Relay(usize),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Seed => write!(f, "Seed transfer"),
            Stage::Relay(0) => write!(f, "First proxy"),
            Stage::Relay(1) => write!(f, "Second proxy"),
            Stage::Relay(2) => write!(f, "Third proxy"),
            Stage::Relay(n) => write!(f, "Proxy {}", n + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PathStatus {
    pub seed: HopStatus,
    pub hops: [HopStatus; INTERMEDIATE_COUNT],
    pub landing: HopStatus,

    /// Landing balance from the last refresh, `None` if never read or unreadable
    pub landing_balance: Option<u64>,
}

impl PathStatus {
    /// Slot for `stage`, `None` past the last intermediate
    pub fn stage(&self, stage: Stage) -> Option<HopStatus> {
        match stage {
            Stage::Seed => Some(self.seed),
            Stage::Relay(n) => self.hops.get(n).copied(),
        }
    }

    fn stage_mut(&mut self, stage: Stage) -> Option<&mut HopStatus> {
        match stage {
            Stage::Seed => Some(&mut self.seed),
            Stage::Relay(n) => self.hops.get_mut(n),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.landing == HopStatus::Completed
    }

    pub fn has_error(&self) -> bool {
        self.seed == HopStatus::Error
            || self.landing == HopStatus::Error
            || self.hops.contains(&HopStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSnapshot {
    pub run_status: RunStatus,
    pub funding: HopStatus,

    /// Funding balance from the last refresh
    pub funding_balance: Option<u64>,

    pub paths: Vec<PathStatus>,
    pub last_message: String,
}

impl RunSnapshot {
    pub fn new(path_count: usize) -> Self {
        Self {
            run_status: RunStatus::Idle,
            funding: HopStatus::Pending,
            funding_balance: None,
            paths: vec![PathStatus::default(); path_count],
            last_message: String::new(),
        }
    }
}

/// Single-writer status channel.
#[derive(Debug)]
pub struct StatusFeed {
    tx: watch::Sender<RunSnapshot>,
}

impl StatusFeed {
    pub fn new(path_count: usize) -> Self {
        let (tx, _) = watch::channel(RunSnapshot::new(path_count));
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.tx.borrow().clone()
    }

    /// Reset every slot for a run of `path_count` paths
    pub fn reset(&self, path_count: usize) {
        self.tx.send_replace(RunSnapshot::new(path_count));
    }

    pub fn set_run_status(&self, status: RunStatus, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|s| {
            s.run_status = status;
            s.last_message = message;
        });
    }

    pub fn set_funding(&self, status: HopStatus) {
        self.tx.send_modify(|s| s.funding = status);
    }

    pub fn set_stage(&self, path: usize, stage: Stage, status: HopStatus) {
        self.tx.send_modify(|s| {
            if let Some(slot) = s.paths.get_mut(path).and_then(|p| p.stage_mut(stage)) {
                *slot = status;
            }
        });
    }

    pub fn set_landing(&self, path: usize, status: HopStatus) {
        self.tx.send_modify(|s| {
            if let Some(p) = s.paths.get_mut(path) {
                p.landing = status;
            }
        });
    }

    /// Cache balances read by a refresh. Extra landing entries are ignored.
    pub fn set_balances(&self, funding: Option<u64>, landing: &[Option<u64>]) {
        self.tx.send_modify(|s| {
            s.funding_balance = funding;
            for (p, balance) in s.paths.iter_mut().zip(landing) {
                p.landing_balance = *balance;
            }
        });
    }

    pub fn message(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|s| s.last_message = message);
    }
}

pub(crate) fn serialize_pubkey<S: Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(key)
}

pub(crate) fn serialize_display<T: fmt::Display, S: Serializer>(
    value: &T,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_updates_are_observed() {
        let feed = StatusFeed::new(2);
        let mut rx = feed.subscribe();
        assert!(!rx.has_changed().unwrap());

        feed.set_stage(1, Stage::Relay(0), HopStatus::InProgress);
        assert!(rx.has_changed().unwrap());

        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.paths[1].hops[0], HopStatus::InProgress);
        assert_eq!(snap.paths[0].hops[0], HopStatus::Pending);
    }

    #[test]
    fn test_out_of_range_path_ignored() {
        let feed = StatusFeed::new(1);
        feed.set_stage(5, Stage::Seed, HopStatus::Error);
        feed.set_landing(5, HopStatus::Error);
        assert!(!feed.snapshot().paths[0].has_error());
    }

    #[test]
    fn test_out_of_range_stage_ignored() {
        let feed = StatusFeed::new(1);
        feed.set_stage(0, Stage::Relay(INTERMEDIATE_COUNT), HopStatus::Error);

        let path = feed.snapshot().paths[0];
        assert!(!path.has_error());
        assert_eq!(path.stage(Stage::Relay(INTERMEDIATE_COUNT)), None);
        assert_eq!(path.stage(Stage::Relay(0)), Some(HopStatus::Pending));
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::Seed.to_string(), "Seed transfer");
        assert_eq!(Stage::Relay(1).to_string(), "Second proxy");
    }

    #[test]
    fn test_snapshot_serializes() {
        let feed = StatusFeed::new(1);
        feed.set_run_status(RunStatus::AwaitingFunding, "waiting");
        let json = serde_json::to_value(feed.snapshot()).unwrap();
        assert_eq!(json["run_status"], "awaiting_funding");
        assert_eq!(json["paths"][0]["seed"], "pending");
        assert_eq!(json["last_message"], "waiting");
        assert!(json["funding_balance"].is_null());
    }

    #[test]
    fn test_set_balances() {
        let feed = StatusFeed::new(2);
        feed.set_balances(Some(10), &[Some(4), None, Some(99)]);

        let snap = feed.snapshot();
        assert_eq!(snap.funding_balance, Some(10));
        assert_eq!(snap.paths[0].landing_balance, Some(4));
        assert_eq!(snap.paths[1].landing_balance, None);
    }
}
