//! Monte Carlo Tree Search (MCTS) with UCT selection.
//!
//! Each iteration of the search:
//! 1. Selection: descend from the root, taking any unvisited child first and
//!    otherwise the child with the highest UCT score, until a leaf or a
//!    decided position is reached
//! 2. Expansion: give the leaf all of its children at once and step into one
//!    of them at random
//! 3. Simulation: play random moves on a scratch board until the game ends
//! 4. Backpropagation: walk back to the root, counting the visit and adding
//!    the reward with its sign flipped on the opponent's plies
//!
//! The tree lives in a [`NodePool`] that is reset at the start of every
//! search. The root represents the position after the opponent's last move,
//! so the root's children are the AI's candidate replies.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace};

use crate::board::{Board, GameState, game_state};
use crate::constants::{
    EXPLORATION, MAX_BRANCHING, MAX_TREE_SIZE, MCTS_TIME_LIMIT_MS, POOL_CAPACITY, REWARD_DRAW,
    REWARD_LOSS, REWARD_WIN,
};
use crate::pool::{NodeId, NodePool, PoolError};
use crate::solver::{Player, PlayerMapping, SearchStats, Solver, SolverError, ensure_playable};

/// A node in the MCTS search tree.
#[derive(Copy, Clone, Debug, Default)]
pub struct SearchNode {
    /// Position at this node
    pub state: Board,
    /// Player whose move led to this position
    pub player: Player,
    /// Number of visits
    pub visits: u32,
    /// Sum of backed-up rewards, from the point of view of `player`
    pub reward: f32,
    /// Parent node (`None` for the root)
    pub parent: Option<NodeId>,
    children: [NodeId; MAX_BRANCHING],
    child_count: u8,
}

impl SearchNode {
    /// Child nodes, one per legal move once expanded.
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children[..self.child_count as usize]
    }

    /// True for unexpanded and terminal nodes.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.child_count == 0
    }

    /// Mean reward per visit, if the node was visited at all.
    pub fn average_reward(&self) -> Option<f32> {
        (self.visits > 0).then(|| self.reward / self.visits as f32)
    }

    fn push_child(&mut self, id: NodeId) {
        debug_assert!((self.child_count as usize) < MAX_BRANCHING, "too many children");
        self.children[self.child_count as usize] = id;
        self.child_count += 1;
    }
}

/// Invalid MCTS settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("tree size budget {max_tree_size} leaves no room for one expansion in a pool of {pool_capacity}")]
    TreeTooLarge {
        max_tree_size: usize,
        pool_capacity: usize,
    },

    #[error("tree size budget must allow at least the root node")]
    EmptyTree,

    #[error("iteration budget must be at least 1")]
    NoIterations,

    #[error("exploration constant must be finite and non-negative, got {0}")]
    Exploration(f32),
}

/// Search budgets and tuning for [`Mcts`].
#[derive(Debug, Clone, PartialEq)]
pub struct MctsConfig {
    /// Wall-clock budget per search. Checked once per iteration.
    pub time_limit: Duration,
    /// Maximum number of iterations per search (`None` = unlimited).
    pub max_iterations: Option<u64>,
    /// Stop once the tree holds this many nodes.
    pub max_tree_size: usize,
    /// Number of nodes the pool can hold.
    pub pool_capacity: usize,
    /// UCT exploration constant.
    pub exploration: f32,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_millis(MCTS_TIME_LIMIT_MS),
            max_iterations: None,
            max_tree_size: MAX_TREE_SIZE,
            pool_capacity: POOL_CAPACITY,
            exploration: EXPLORATION,
        }
    }
}

impl MctsConfig {
    /// Config bounded by an iteration count, with a pool sized to match.
    ///
    /// Each iteration adds at most one expansion to the tree.
    pub fn with_iterations(iterations: u64) -> Self {
        let max_tree_size = (iterations as usize)
            .saturating_mul(MAX_BRANCHING)
            .saturating_add(1)
            .min(MAX_TREE_SIZE);
        Self {
            time_limit: Duration::from_secs(3600),
            max_iterations: Some(iterations),
            max_tree_size,
            pool_capacity: max_tree_size + MAX_BRANCHING,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tree_size == 0 {
            return Err(ConfigError::EmptyTree);
        }
        if self.max_tree_size.saturating_add(MAX_BRANCHING) > self.pool_capacity {
            return Err(ConfigError::TreeTooLarge {
                max_tree_size: self.max_tree_size,
                pool_capacity: self.pool_capacity,
            });
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::NoIterations);
        }
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(ConfigError::Exploration(self.exploration));
        }
        Ok(())
    }
}

/// Monte Carlo Tree Search solver.
pub struct Mcts {
    player: Player,
    mapping: PlayerMapping,
    config: MctsConfig,
    pool: NodePool<SearchNode>,
    rng: fastrand::Rng,
    stats: SearchStats,
}

impl Mcts {
    /// Create a solver with an entropy-seeded random generator.
    pub fn new(player: Player, mapping: PlayerMapping, config: MctsConfig) -> Result<Self, ConfigError> {
        Self::with_rng(player, mapping, config, fastrand::Rng::new())
    }

    /// Create a solver drawing from `rng`. A seeded generator makes the
    /// search reproducible.
    pub fn with_rng(
        player: Player,
        mapping: PlayerMapping,
        config: MctsConfig,
        rng: fastrand::Rng,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            player,
            mapping,
            pool: NodePool::new(config.pool_capacity),
            config,
            rng,
            stats: SearchStats::default(),
        })
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Nodes allocated by the most recent search.
    pub fn expanded_nodes_count(&self) -> usize {
        self.pool.len()
    }

    /// Node of the most recent search tree.
    pub fn node(&self, id: NodeId) -> &SearchNode {
        self.pool.get(id)
    }

    /// Root of the most recent search tree.
    pub fn root(&self) -> Option<&SearchNode> {
        (!self.pool.is_empty()).then(|| self.pool.get(NodeId(0)))
    }

    fn has_budget(&self, start: Instant, iterations: u64) -> bool {
        if self.config.max_iterations.is_some_and(|max| iterations >= max) {
            return false;
        }
        if self.pool.len() >= self.config.max_tree_size {
            return false;
        }
        start.elapsed() < self.config.time_limit
    }

    /// Upper confidence bound of a visited child.
    #[inline]
    fn uct(&self, node: &SearchNode, ln_parent_visits: f32) -> f32 {
        let visits = node.visits as f32;
        let exploitation = node.reward / visits;
        let exploration = (ln_parent_visits / visits).sqrt();
        exploitation + self.config.exploration * exploration
    }

    /// Pick the child to descend into: the first unvisited one, otherwise the
    /// first with the highest UCT score.
    fn best_child(&self, id: NodeId) -> NodeId {
        let parent = self.pool.get(id);
        let children = parent.children();
        let ln_visits = (parent.visits as f32).ln();

        let mut best = children[0];
        let mut best_score = f32::NEG_INFINITY;
        for &child in children {
            let node = self.pool.get(child);
            if node.visits == 0 {
                return child;
            }
            let score = self.uct(node, ln_visits);
            if score > best_score {
                best = child;
                best_score = score;
            }
        }
        best
    }

    fn select(&self, root: NodeId) -> NodeId {
        let mut id = root;
        loop {
            let node = self.pool.get(id);
            if node.is_leaf() || game_state(node.state).is_terminal() {
                return id;
            }
            id = self.best_child(id);
        }
    }

    /// Add every legal child of `id` and return one of them at random.
    fn expand(&mut self, id: NodeId) -> Result<NodeId, PoolError> {
        let parent = *self.pool.get(id);
        let player = parent.player.next();
        let mark = self.mapping.mark(player);

        for index in parent.state.free_cells() {
            let child = self.pool.acquire()?;
            let node = self.pool.get_mut(child);
            node.state = parent.state.with(index, mark);
            node.player = player;
            node.parent = Some(id);
            self.pool.get_mut(id).push_child(child);
        }

        let children = self.pool.get(id).children();
        Ok(children[self.rng.usize(..children.len())])
    }

    /// Play random moves from `id` to the end of the game and score the
    /// result for the searching player.
    fn simulate(&mut self, id: NodeId) -> f32 {
        let node = self.pool.get(id);
        let mut board = node.state;
        let mut player = node.player.next();
        let me = self.mapping.mark(self.player);

        loop {
            match game_state(board) {
                GameState::Win(mark) if mark == me => return REWARD_WIN,
                GameState::Win(_) => return REWARD_LOSS,
                GameState::Draw => return REWARD_DRAW,
                GameState::Ongoing => {}
            }
            let free = board.free_cells().count();
            let pick = self.rng.usize(..free);
            if let Some(index) = board.free_cells().nth(pick) {
                board.place(index, self.mapping.mark(player));
            }
            player = player.next();
        }
    }

    /// Negamax backup: the reward counts for nodes reached by the searching
    /// player's moves and against nodes reached by the opponent's.
    fn backup(&mut self, id: NodeId, reward: f32) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.pool.get_mut(node_id);
            node.visits += 1;
            node.reward += if node.player == self.player { reward } else { -reward };
            current = node.parent;
        }
    }

    /// Root child with the highest accumulated reward, first found on ties.
    fn best_root_child(&self, root: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;
        for &child in self.pool.get(root).children() {
            let reward = self.pool.get(child).reward;
            if best.is_none_or(|(_, r)| reward > r) {
                best = Some((child, reward));
            }
        }
        best.map(|(id, _)| id)
    }
}

impl Solver for Mcts {
    fn name(&self) -> &'static str {
        "mcts"
    }

    fn run(&mut self, board: Board) -> Result<usize, SolverError> {
        ensure_playable(board)?;
        let start = Instant::now();

        self.pool.reset();
        let root = self.pool.acquire()?;
        {
            let node = self.pool.get_mut(root);
            node.state = board;
            node.player = self.player.next();
        }

        let mut iterations = 0u64;
        loop {
            let mut leaf = self.select(root);
            if !game_state(self.pool.get(leaf).state).is_terminal() {
                leaf = self.expand(leaf)?;
            }
            let reward = self.simulate(leaf);
            self.backup(leaf, reward);
            iterations += 1;
            trace!(iterations, reward, nodes = self.pool.len(), "mcts iteration");

            if !self.has_budget(start, iterations) {
                break;
            }
        }

        let chosen = self.best_root_child(root).ok_or(SolverError::NoMove)?;
        let cell = board
            .changed_cell(self.pool.get(chosen).state)
            .ok_or(SolverError::NoMove)?;

        self.stats = SearchStats {
            expanded_nodes: self.pool.len(),
            iterations,
            elapsed: start.elapsed(),
            best_value: None,
        };
        debug!(
            cell,
            iterations,
            nodes = self.pool.len(),
            elapsed_ms = self.stats.elapsed.as_millis() as u64,
            "mcts search finished"
        );
        Ok(cell)
    }

    fn stats(&self) -> SearchStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(player: Player, iterations: u64, seed: u64) -> Mcts {
        Mcts::with_rng(
            player,
            PlayerMapping::default(),
            MctsConfig::with_iterations(iterations),
            fastrand::Rng::with_seed(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(MctsConfig::default().validate(), Ok(()));
        assert_eq!(MctsConfig::with_iterations(500).validate(), Ok(()));
    }

    #[test]
    fn test_config_rejects_small_pool() {
        let config = MctsConfig {
            max_tree_size: 100,
            pool_capacity: 100,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TreeTooLarge {
                max_tree_size: 100,
                pool_capacity: 100
            })
        );
        assert!(Mcts::new(Player::FIRST, PlayerMapping::default(), config).is_err());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let zero = MctsConfig {
            max_iterations: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::NoIterations));

        let nan = MctsConfig {
            exploration: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(nan.validate(), Err(ConfigError::Exploration(_))));
    }

    #[test]
    fn test_single_iteration_expands_root() {
        let board: Board = "x../.o./...".parse().unwrap();
        let mut mcts = seeded(Player::FIRST, 1, 7);
        let cell = mcts.run(board).unwrap();
        assert!(board.is_free(cell));
        // root plus one child per free cell
        assert_eq!(mcts.expanded_nodes_count(), 1 + 7);
        assert_eq!(mcts.stats().iterations, 1);
    }

    #[test]
    fn test_visits_sum_to_root() {
        let board = Board::new();
        let mut mcts = seeded(Player::FIRST, 300, 3);
        mcts.run(board).unwrap();
        let root = mcts.root().unwrap();
        assert_eq!(root.visits, 300);
        let child_visits: u32 = root.children().iter().map(|&id| mcts.node(id).visits).sum();
        assert_eq!(child_visits, root.visits);
    }

    #[test]
    fn test_children_alternate_player() {
        let mut mcts = seeded(Player::SECOND, 50, 11);
        let board: Board = "x../.../...".parse().unwrap();
        mcts.run(board).unwrap();
        let root = *mcts.root().unwrap();
        assert_eq!(root.player, Player::FIRST);
        for &id in root.children() {
            let child = mcts.node(id);
            assert_eq!(child.player, Player::SECOND);
            assert_eq!(child.parent, Some(NodeId(0)));
            assert_eq!(child.state.count(crate::board::Mark::O), 1);
        }
    }

    #[test]
    fn test_rejects_decided_board() {
        let mut mcts = seeded(Player::FIRST, 10, 1);
        let board: Board = "xxx/oo./...".parse().unwrap();
        assert_eq!(mcts.run(board), Err(SolverError::GameOver));
    }

    #[test]
    fn test_time_budget_stops_search() {
        let config = MctsConfig {
            time_limit: Duration::from_millis(20),
            ..Default::default()
        };
        let mut mcts = Mcts::with_rng(
            Player::FIRST,
            PlayerMapping::default(),
            config,
            fastrand::Rng::with_seed(5),
        )
        .unwrap();
        let cell = mcts.run(Board::new()).unwrap();
        assert!(cell < 9);
        assert!(mcts.stats().iterations >= 1);
    }

    #[test]
    fn test_tree_size_budget_stops_search() {
        let config = MctsConfig {
            max_tree_size: 50,
            pool_capacity: 50 + MAX_BRANCHING,
            ..Default::default()
        };
        let mut mcts = Mcts::with_rng(
            Player::FIRST,
            PlayerMapping::default(),
            config,
            fastrand::Rng::with_seed(9),
        )
        .unwrap();
        mcts.run(Board::new()).unwrap();
        assert!(mcts.expanded_nodes_count() < 50 + MAX_BRANCHING);
        assert!(mcts.expanded_nodes_count() >= 50);
    }
}
