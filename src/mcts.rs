use std::ops::ControlFlow;

use log::{debug, trace};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::game::{GameState, Move};
use crate::protocol::{Candidate, CandidateReport, MessageSink, SearchMessage, SearchRequest};
use crate::rollout::RolloutPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MctsConfig {
    /// Number of simulations per search request.
    #[serde(default = "default_simulation_budget")]
    pub simulation_budget: u32,
    /// Exploration constant `C` in the UCT term.
    #[serde(default = "default_uct_constant")]
    pub uct_constant: f64,
    /// Emit ranked root candidates alongside progress.
    #[serde(default)]
    pub introspection: bool,
    /// Background searches pause every `progress_interval` simulations to report progress;
    /// foreground ones run straight through.
    #[serde(default = "default_background")]
    pub background: bool,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u32,
    /// How many root candidates a report carries.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Fixed seed for reproducible searches; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Chance that a rollout step moves the pawn instead of trying a wall.
    #[serde(default = "default_rollout_pawn_probability")]
    pub rollout_pawn_probability: f64,
    /// Half-moves after which a rollout is adjudicated by distance to goal.
    #[serde(default = "default_max_rollout_plies")]
    pub max_rollout_plies: u32,
}

fn default_simulation_budget() -> u32 {
    10_000
}
fn default_uct_constant() -> f64 {
    0.2
}
fn default_background() -> bool {
    true
}
fn default_progress_interval() -> u32 {
    100
}
fn default_top_n() -> usize {
    5
}
fn default_rollout_pawn_probability() -> f64 {
    0.7
}
fn default_max_rollout_plies() -> u32 {
    400
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            simulation_budget: default_simulation_budget(),
            uct_constant: default_uct_constant(),
            introspection: false,
            background: default_background(),
            progress_interval: default_progress_interval(),
            top_n: default_top_n(),
            seed: None,
            rollout_pawn_probability: default_rollout_pawn_probability(),
            max_rollout_plies: default_max_rollout_plies(),
        }
    }
}

impl MctsConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        let reason = if self.simulation_budget == 0 {
            "simulation budget must be positive"
        } else if !(self.uct_constant.is_finite() && self.uct_constant > 0.0) {
            "UCT constant must be a positive finite number"
        } else if self.progress_interval == 0 {
            "progress interval must be positive"
        } else if !(0.0..=1.0).contains(&self.rollout_pawn_probability) {
            "rollout pawn probability must lie in [0, 1]"
        } else {
            return Ok(());
        };
        Err(SearchError::InvalidConfig {
            reason: reason.to_owned(),
        })
    }

    /// Whether a session built with `self` may be reused for a request built with `other`.
    pub fn shares_tree_with(&self, other: &MctsConfig) -> bool {
        self.simulation_budget == other.simulation_budget && self.uct_constant == other.uct_constant
    }

    fn rollout_policy(&self) -> RolloutPolicy {
        RolloutPolicy {
            pawn_probability: self.rollout_pawn_probability,
            max_plies: self.max_rollout_plies,
        }
    }
}

struct SearchNode {
    /// Move leading here from the parent; `None` only for the root.
    mv: Option<Move>,
    parent: Option<usize>,
    /// Pawn that played `mv`. Wins are counted from its side.
    mover: u8,
    visits: u32,
    wins: u32,
    /// Generated on the first visit.
    untried: Option<Vec<Move>>,
    children: Vec<usize>,
    terminal_winner: Option<u8>,
}

impl SearchNode {
    fn new(
        mv: Option<Move>,
        parent: Option<usize>,
        mover: u8,
        terminal_winner: Option<u8>,
    ) -> Self {
        Self {
            mv,
            parent,
            mover,
            visits: 0,
            wins: 0,
            untried: None,
            children: Vec::new(),
            terminal_winner,
        }
    }

    fn win_rate(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.visits)
        }
    }

    fn uct(&self, parent_visits: u32, c: f64) -> f64 {
        if self.visits == 0 {
            return f64::INFINITY;
        }
        let exploration = (f64::from(parent_visits).ln() / f64::from(self.visits)).sqrt();
        self.win_rate() + c * exploration
    }
}

/// One search tree grown over a fixed root position.
///
/// Nodes live in a flat arena and hold only the move that reached them; the position for a node is
/// rebuilt by replaying moves from a clone of the root, so the tree never aliases the caller's state.
pub struct SearchSession {
    config: MctsConfig,
    root_state: GameState,
    nodes: Vec<SearchNode>,
    rng: SmallRng,
    simulations: u64,
}

impl SearchSession {
    pub fn new(config: MctsConfig, root_state: GameState) -> Result<Self, SearchError> {
        config.validate()?;
        if root_state.is_over() {
            return Err(SearchError::GameOver);
        }
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let root_mover = 1 - root_state.pawn_index_of_turn();
        Ok(Self {
            config,
            root_state,
            nodes: vec![SearchNode::new(None, None, root_mover, None)],
            rng,
            simulations: 0,
        })
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn root_state(&self) -> &GameState {
        &self.root_state
    }

    /// Simulations run on this tree across all requests.
    pub fn total_simulations(&self) -> u64 {
        self.simulations
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Runs the configured number of simulations and posts the chosen move.
    ///
    /// In background mode the loop pauses every `progress_interval` simulations to post the
    /// progress fraction and, with introspection, the ranked root candidates. A sink that answers
    /// [`ControlFlow::Break`] cancels the search; no move is posted in that case.
    pub fn run(&mut self, sink: &mut impl MessageSink) -> Result<Move, SearchError> {
        let budget = self.config.simulation_budget;
        let interval = self.config.progress_interval;
        debug!(
            "search start: turn {}, budget {budget}, C {}, tree {} nodes",
            self.root_state.turn(),
            self.config.uct_constant,
            self.nodes.len()
        );

        for done in 1..=budget {
            self.simulate_once();
            if self.config.background && done % interval == 0 && done < budget {
                let progress = f64::from(done) / f64::from(budget);
                trace!("search progress {progress:.3}");
                self.report(sink, progress)?;
            }
        }

        if self.config.background {
            self.report(sink, 1.0)?;
        } else if self.config.introspection {
            let report = CandidateReport::new(self.ranked_candidates(self.config.top_n));
            post(sink, SearchMessage::Candidates(report))?;
        }

        let best = self.best_move().ok_or(SearchError::NoCandidates)?;
        debug!("search done: {best:?} after {} simulations", self.simulations);
        post(sink, SearchMessage::Final(best))?;
        Ok(best)
    }

    fn report(&self, sink: &mut impl MessageSink, progress: f64) -> Result<(), SearchError> {
        post(sink, SearchMessage::Progress(progress))?;
        if self.config.introspection {
            let report = CandidateReport::new(self.ranked_candidates(self.config.top_n));
            post(sink, SearchMessage::Candidates(report))?;
        }
        Ok(())
    }

    /// Most-visited root child; earlier candidates win ties.
    pub fn best_move(&self) -> Option<Move> {
        let mut best: Option<&SearchNode> = None;
        for &child in &self.nodes[0].children {
            let node = &self.nodes[child];
            if best.map_or(true, |current| node.visits > current.visits) {
                best = Some(node);
            }
        }
        best.and_then(|node| node.mv)
    }

    /// Root children ranked by visit count, truncated to `limit`.
    pub fn ranked_candidates(&self, limit: usize) -> Vec<Candidate> {
        let mut children: Vec<&SearchNode> =
            self.nodes[0].children.iter().map(|&child| &self.nodes[child]).collect();
        children.sort_by(|a, b| b.visits.cmp(&a.visits));
        children
            .into_iter()
            .take(limit)
            .filter_map(|node| {
                node.mv.map(|mv| Candidate {
                    mv,
                    win_rate: node.win_rate(),
                    simulations: node.visits,
                })
            })
            .collect()
    }

    fn simulate_once(&mut self) {
        let mut state = self.root_state.clone();
        let leaf = self.select_and_expand(&mut state);
        let winner = match state.winner() {
            Some(winner) => winner,
            None => self.config.rollout_policy().play(state, &mut self.rng),
        };
        self.backpropagate(leaf, winner);
        self.simulations += 1;
    }

    /// Walks down by UCT until a node still has untried moves, expands one of them and returns the
    /// new child. `state` tracks the position of the node being visited.
    fn select_and_expand(&mut self, state: &mut GameState) -> usize {
        let c = self.config.uct_constant;
        let mut current = 0;
        loop {
            if self.nodes[current].terminal_winner.is_some() {
                return current;
            }
            if self.nodes[current].untried.is_none() {
                self.nodes[current].untried = Some(state.search_moves());
            }
            if let Some(child) = self.expand(current, state) {
                return child;
            }

            let node = &self.nodes[current];
            let parent_visits = node.visits;
            let mut best: Option<(usize, f64)> = None;
            for &child in &node.children {
                let score = self.nodes[child].uct(parent_visits, c);
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((child, score));
                }
            }
            let Some((child, _)) = best else {
                // no moves from here; score it as it stands
                return current;
            };
            if let Some(mv) = self.nodes[child].mv {
                if state.apply_move(mv, false).is_err() {
                    return current;
                }
            }
            current = child;
        }
    }

    fn expand(&mut self, parent: usize, state: &mut GameState) -> Option<usize> {
        let untried = self.nodes[parent].untried.as_mut()?;
        if untried.is_empty() {
            return None;
        }
        let mv = untried.swap_remove(self.rng.gen_range(0..untried.len()));
        let mover = state.pawn_index_of_turn();
        if state.apply_move(mv, false).is_err() {
            return None;
        }
        let child = self.nodes.len();
        self.nodes.push(SearchNode::new(Some(mv), Some(parent), mover, state.winner()));
        self.nodes[parent].children.push(child);
        Some(child)
    }

    fn backpropagate(&mut self, leaf: usize, winner: u8) {
        let mut current = Some(leaf);
        while let Some(index) = current {
            let node = &mut self.nodes[index];
            node.visits += 1;
            if node.mover == winner {
                node.wins += 1;
            }
            current = node.parent;
        }
    }
}

fn post(sink: &mut impl MessageSink, message: SearchMessage) -> Result<(), SearchError> {
    match sink.post(message) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(SearchError::Cancelled),
    }
}

/// Caller-side owner of the (at most one) live search session.
///
/// A request reuses the current tree only when it carries the same budget and exploration constant
/// and its state equals the tree's root; anything else tears the session down and starts fresh.
#[derive(Default)]
pub struct SearchController {
    session: Option<SearchSession>,
}

impl SearchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&SearchSession> {
        self.session.as_ref()
    }

    /// Drops the current session and everything it computed.
    pub fn cancel(&mut self) {
        if self.session.take().is_some() {
            debug!("search session discarded");
        }
    }

    pub fn search(
        &mut self,
        request: SearchRequest,
        sink: &mut impl MessageSink,
    ) -> Result<Move, SearchError> {
        let config = request.config();
        config.validate()?;
        let reusable = self.session.as_ref().is_some_and(|session| {
            session.config.shares_tree_with(&config) && session.root_state == request.state
        });

        let session = match self.session.take() {
            Some(mut session) if reusable => {
                debug!("reusing search tree with {} nodes", session.node_count());
                session.config = config;
                session
            }
            _ => SearchSession::new(config, request.state)?,
        };

        let session = self.session.insert(session);
        let result = session.run(sink);
        if result.is_err() {
            self.cancel();
        }
        result
    }
}
