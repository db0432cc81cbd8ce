use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of applying one action to an environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step<O, I = serde_json::Value> {
    pub obs: O,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: I,
}

impl<O, I> Step<O, I> {
    /// Either episode-end flag is set.
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Bookkeeping for one finished episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub id: Uuid,
    pub index: u64,
    pub steps: u64,
    pub total_reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}
