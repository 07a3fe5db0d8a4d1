//! Eagerly built minimax game tree.
//!
//! Unlike [`crate::minimax::Minimax`], which walks the tree by mutating a
//! single board, this variant materialises every visited position as a
//! [`MinimaxTreeNode`] in a [`NodePool`]. Children are stored as a fixed array
//! of node ids plus a count, so the whole tree is a flat arena with no
//! pointers. It is mainly useful for analysis: after [`GameTree::build`], the
//! value of every explored position is available.

use crate::board::{Board, Mark, game_state};
use crate::constants::{MAX_BRANCHING, MINIMAX_DEPTH};
use crate::minimax::heuristic;
use crate::pool::{NodeId, NodePool, PoolError};

/// One position in the eager minimax tree.
#[derive(Copy, Clone, Debug, Default)]
pub struct MinimaxTreeNode {
    /// Position at this node
    pub state: Board,
    /// Minimax value from the searching player's point of view
    pub heuristic: i32,
    children: [NodeId; MAX_BRANCHING],
    count: u8,
}

impl MinimaxTreeNode {
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children[..self.count as usize]
    }

    fn push_child(&mut self, id: NodeId) {
        debug_assert!((self.count as usize) < MAX_BRANCHING, "too many children");
        self.children[self.count as usize] = id;
        self.count += 1;
    }
}

/// Arena-backed minimax tree.
pub struct GameTree {
    pool: NodePool<MinimaxTreeNode>,
    mark: Mark,
    root: Option<NodeId>,
}

impl GameTree {
    /// Create an empty tree that can hold up to `capacity` positions.
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: NodePool::new(capacity),
            mark: Mark::X,
            root: None,
        }
    }

    /// Build the tree below `board` with `mark` to move, searching the same
    /// depth as [`crate::minimax::Minimax`]. Returns the root value.
    pub fn build(&mut self, board: Board, mark: Mark) -> Result<i32, PoolError> {
        self.build_with_depth(board, mark, MINIMAX_DEPTH + 1)
    }

    /// Build the tree with `depth` plies counted from the root itself.
    pub fn build_with_depth(&mut self, board: Board, mark: Mark, depth: i32) -> Result<i32, PoolError> {
        self.pool.reset();
        self.root = None;
        self.mark = mark;

        let root = self.pool.acquire()?;
        self.pool.get_mut(root).state = board;
        let value = self.apply(root, depth, true)?;
        self.root = Some(root);
        Ok(value)
    }

    fn expand(&mut self, id: NodeId, maximizing: bool) -> Result<(), PoolError> {
        let state = self.pool.get(id).state;
        let mark = if maximizing { self.mark } else { self.mark.opponent() };
        for index in state.free_cells() {
            let child = self.pool.acquire()?;
            self.pool.get_mut(child).state = state.with(index, mark);
            self.pool.get_mut(id).push_child(child);
        }
        Ok(())
    }

    fn apply(&mut self, id: NodeId, depth: i32, maximizing: bool) -> Result<i32, PoolError> {
        let state = self.pool.get(id).state;
        if depth == 0 || game_state(state).is_terminal() {
            let value = heuristic(state, depth, self.mark);
            self.pool.get_mut(id).heuristic = value;
            return Ok(value);
        }

        self.expand(id, maximizing)?;
        let node = *self.pool.get(id);
        let mut best = if maximizing { i32::MIN } else { i32::MAX };
        for &child in node.children() {
            let value = self.apply(child, depth - 1, !maximizing)?;
            best = if maximizing { best.max(value) } else { best.min(value) };
        }
        self.pool.get_mut(id).heuristic = best;
        Ok(best)
    }

    /// Root node of the last successful build.
    pub fn root(&self) -> Option<&MinimaxTreeNode> {
        self.root.map(|id| self.pool.get(id))
    }

    pub fn node(&self, id: NodeId) -> &MinimaxTreeNode {
        self.pool.get(id)
    }

    /// Number of positions in the tree.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Cell of the first root child whose value matches the root value.
    pub fn best_move(&self) -> Option<usize> {
        let root = self.root()?;
        root.children()
            .iter()
            .map(|&id| self.pool.get(id))
            .find(|child| child.heuristic == root.heuristic)
            .and_then(|child| root.state.changed_cell(child.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::POOL_CAPACITY;

    #[test]
    fn test_full_tree_size() {
        let mut tree = GameTree::new(POOL_CAPACITY);
        let value = tree.build(Board::new(), Mark::X).unwrap();
        // Perfect play draws.
        assert_eq!(value, 0);
        // Every reachable position of the game, counted once per move order.
        assert_eq!(tree.len(), 549_946);
        assert_eq!(tree.best_move(), Some(0));
    }

    #[test]
    fn test_terminal_root_has_no_move() {
        let mut tree = GameTree::new(16);
        let board: Board = "xxx/oo./...".parse().unwrap();
        tree.build(board, Mark::O).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.best_move(), None);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut tree = GameTree::new(8);
        assert!(matches!(
            tree.build(Board::new(), Mark::X),
            Err(PoolError::Exhausted { capacity: 8 })
        ));
        assert!(tree.root().is_none());
    }

    #[test]
    fn test_children_values() {
        let mut tree = GameTree::new(1024);
        let board: Board = "xx./oo./...".parse().unwrap();
        tree.build(board, Mark::X).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.children().len(), 5);
        assert_eq!(tree.best_move(), Some(2));
        let best = root
            .children()
            .iter()
            .map(|&id| tree.node(id).heuristic)
            .max();
        assert_eq!(best, Some(root.heuristic));
    }
}
