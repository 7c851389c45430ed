use std::fmt;
use std::sync::Arc;

use super::NodeKey;

/// Kind of child-list mutation reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildOp {
    Add,
    /// A child was replaced in place by `set_child`.
    Change,
    Delete,
}

/// Callback fired after a parent's child list changed: `(parent, child, op)`.
pub type ChildListener = Arc<dyn Fn(NodeKey, NodeKey, ChildOp) + Send + Sync>;

/// Ordered child list of a composite node.
///
/// Keys are non-owning; the nodes themselves live in the
/// [`NodeArena`](super::NodeArena), which is the only place that mutates
/// this list so that the parent back-references stay in sync.
#[derive(Clone, Default)]
pub struct Composite {
    children: Vec<NodeKey>,
    listeners: Vec<ChildListener>,
}

impl Composite {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn contains(&self, child: NodeKey) -> bool {
        self.children.contains(&child)
    }

    #[must_use]
    pub fn position(&self, child: NodeKey) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    pub fn add_listener(&mut self, listener: ChildListener) {
        self.listeners.push(listener);
    }

    #[must_use]
    pub fn listeners(&self) -> &[ChildListener] {
        &self.listeners
    }

    pub(crate) fn push(&mut self, child: NodeKey) {
        self.children.push(child);
    }

    /// Puts `child` at `index`, returning the previous occupant.
    pub(crate) fn replace(&mut self, index: usize, child: NodeKey) -> NodeKey {
        std::mem::replace(&mut self.children[index], child)
    }

    pub(crate) fn remove(&mut self, child: NodeKey) -> bool {
        match self.position(child) {
            Some(i) => {
                self.children.remove(i);
                true
            }
            None => false,
        }
    }

    /// Removes up to `count` children starting at `start`, clamped to the list.
    pub(crate) fn drain(&mut self, start: usize, count: usize) -> Vec<NodeKey> {
        let start = start.min(self.children.len());
        let end = start.saturating_add(count).min(self.children.len());
        self.children.drain(start..end).collect()
    }

    pub(crate) fn clear_children(&mut self) {
        self.children.clear();
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("children", &self.children)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn drain_clamps_to_bounds() {
        let mut keys: SlotMap<NodeKey, ()> = SlotMap::with_key();
        let mut composite = Composite::new();
        let all: Vec<NodeKey> = (0..4).map(|_| keys.insert(())).collect();
        for &k in &all {
            composite.push(k);
        }

        assert_eq!(composite.drain(2, 10), all[2..].to_vec());
        assert!(composite.drain(7, 1).is_empty());
        assert_eq!(composite.drain(0, usize::MAX), all[..2].to_vec());
        assert!(composite.is_empty());
    }
}
