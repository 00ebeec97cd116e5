//! Message contract between a caller and the search context.
//!
//! The caller sends one [`SearchRequest`]; the search answers with a stream of
//! [`SearchMessage`]s: progress fractions and, when introspection is on, ranked root candidates,
//! closed by the chosen move. How the messages travel (a Web Worker `postMessage`, a callback, a
//! channel) is up to the [`MessageSink`] implementation.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::game::{GameState, Move};
use crate::mcts::MctsConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub state: GameState,
    pub simulation_budget: u32,
    pub uct_constant: f64,
    #[serde(default)]
    pub introspection: bool,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u32,
    /// Foreground searches run to completion without progress messages.
    #[serde(default = "default_background")]
    pub background: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_progress_interval() -> u32 {
    MctsConfig::default().progress_interval
}

fn default_background() -> bool {
    true
}

impl SearchRequest {
    pub fn new(state: GameState, simulation_budget: u32, uct_constant: f64) -> Self {
        Self {
            state,
            simulation_budget,
            uct_constant,
            introspection: false,
            progress_interval: default_progress_interval(),
            background: default_background(),
            seed: None,
        }
    }

    /// Search configuration for this request, layered over the defaults.
    pub fn config(&self) -> MctsConfig {
        MctsConfig {
            simulation_budget: self.simulation_budget,
            uct_constant: self.uct_constant,
            introspection: self.introspection,
            background: self.background,
            progress_interval: self.progress_interval,
            seed: self.seed,
            ..MctsConfig::default()
        }
    }
}

/// Statistics for one root move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(rename = "move")]
    pub mv: Move,
    pub win_rate: f64,
    pub simulations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateReport {
    kind: &'static str,
    pub candidates: Vec<Candidate>,
}

impl CandidateReport {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            kind: "candidates",
            candidates,
        }
    }
}

/// Everything the search context emits, in wire shape: a bare number for progress, a
/// `{ kind: "candidates", ... }` object, or the final move object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchMessage {
    Progress(f64),
    Candidates(CandidateReport),
    Final(Move),
}

/// Where search messages go. Returning [`ControlFlow::Break`] asks the search to stop; it then
/// ends without delivering a move.
pub trait MessageSink {
    fn post(&mut self, message: SearchMessage) -> ControlFlow<()>;
}

impl MessageSink for Vec<SearchMessage> {
    fn post(&mut self, message: SearchMessage) -> ControlFlow<()> {
        self.push(message);
        ControlFlow::Continue(())
    }
}
