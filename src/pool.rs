//! Fixed-capacity node arena.
//!
//! Search trees are built and thrown away once per search, so nodes are never
//! freed one by one. The pool hands out slots sequentially and invalidates all
//! of them at once on [`NodePool::reset`]. Slots are addressed by [`NodeId`].

use thiserror::Error;

/// Index of a node inside a [`NodePool`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("node pool exhausted (capacity {capacity})")]
    Exhausted { capacity: usize },
}

/// Arena of default-constructible nodes.
///
/// Backing storage grows up to the largest size reached so far and is reused
/// after a reset, so a long-lived pool stops allocating once warmed up.
#[derive(Debug)]
pub struct NodePool<T> {
    nodes: Vec<T>,
    size: usize,
    capacity: usize,
}

impl<T: Default> NodePool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            size: 0,
            capacity,
        }
    }

    /// Number of nodes handed out since the last reset.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.size >= self.capacity
    }

    /// Invalidate every node handed out so far.
    #[inline]
    pub fn reset(&mut self) {
        self.size = 0;
    }

    /// Hand out a freshly defaulted node.
    pub fn acquire(&mut self) -> Result<NodeId, PoolError> {
        if self.is_full() {
            return Err(PoolError::Exhausted {
                capacity: self.capacity,
            });
        }
        if self.size < self.nodes.len() {
            self.nodes[self.size] = T::default();
        } else {
            self.nodes.push(T::default());
        }
        let id = NodeId(self.size as u32);
        self.size += 1;
        Ok(id)
    }

    /// Get a reference to a live node.
    #[inline]
    pub fn get(&self, id: NodeId) -> &T {
        debug_assert!(id.index() < self.size, "stale node id {id:?}");
        &self.nodes[id.index()]
    }

    /// Get a mutable reference to a live node.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        debug_assert!(id.index() < self.size, "stale node id {id:?}");
        &mut self.nodes[id.index()]
    }
}
