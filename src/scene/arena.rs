use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use super::composite::{ChildListener, ChildOp};
use super::node::Node;
use super::{NodeId, NodeKey};
use crate::engine::Entity;
use crate::errors::{GraphError, Result};

/// Owner of every node in a scene graph.
///
/// Nodes are addressed by generational [`NodeKey`]s; parent/child links are
/// key pairs kept symmetric by the methods here. Insertion order is kept for
/// iteration, and identity indices (node id, drawable entity) reject
/// double ownership.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: SlotMap<NodeKey, Node>,
    order: Vec<NodeKey>,
    ids: FxHashMap<NodeId, NodeKey>,
    entities: FxHashMap<Entity, NodeKey>,
}

impl NodeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `node`.
    ///
    /// Fails if a node with the same id, or a drawable on the same engine
    /// entity, is already owned. Links the node carried in are dropped.
    pub fn insert(&mut self, node: Node) -> Result<NodeKey> {
        if self.ids.contains_key(&node.id()) {
            return Err(GraphError::AlreadyAdopted(node.id()));
        }
        let entity = node.as_drawable().map(|d| d.entity());
        if let Some(entity) = entity
            && self.entities.contains_key(&entity)
        {
            return Err(GraphError::AlreadyAdopted(node.id()));
        }

        Ok(self.insert_unchecked(node))
    }

    /// Inserts a node freshly built by the graph, whose identity cannot
    /// collide with anything already owned.
    pub(crate) fn insert_unchecked(&mut self, mut node: Node) -> NodeKey {
        node.unlink();
        let id = node.id();
        let entity = node.as_drawable().map(|d| d.entity());
        let key = self.nodes.insert(node);
        self.order.push(key);
        self.ids.insert(id, key);
        if let Some(entity) = entity {
            self.entities.insert(entity, key);
        }
        key
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    #[must_use]
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    #[must_use]
    pub fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.ids.get(&id).copied()
    }

    /// Node owning the drawable on `entity`.
    #[must_use]
    pub fn key_of_entity(&self, entity: Entity) -> Option<NodeKey> {
        self.entities.get(&entity).copied()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> &[NodeKey] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.order.iter().filter_map(|&k| self.nodes.get(k).map(|n| (k, n)))
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    fn node(&self, key: NodeKey) -> Result<&Node> {
        self.nodes.get(key).ok_or(GraphError::NodeNotFound(key))
    }

    fn check_composite(&self, key: NodeKey) -> Result<()> {
        let node = self.node(key)?;
        if node.is_composite() {
            Ok(())
        } else {
            Err(GraphError::NotComposite(node.name().to_string()))
        }
    }

    /// Whether `ancestor` is reachable from `key` through parent links.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut stack: Vec<NodeKey> = match self.nodes.get(key) {
            Some(node) => node.parents().to_vec(),
            None => return false,
        };
        let mut seen = FxHashSet::default();
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if seen.insert(current)
                && let Some(node) = self.nodes.get(current)
            {
                stack.extend_from_slice(node.parents());
            }
        }
        false
    }

    fn check_link(&self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.check_composite(parent)?;
        self.node(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            log::warn!("Refusing to attach {child:?} under {parent:?}: would create a cycle");
            return Err(GraphError::CycleDetected { parent, child });
        }
        Ok(())
    }

    fn add_back_ref(&mut self, child: NodeKey, parent: NodeKey) {
        if let Some(node) = self.nodes.get_mut(child)
            && !node.parents.contains(&parent)
        {
            node.parents.push(parent);
        }
    }

    fn remove_back_ref(&mut self, child: NodeKey, parent: NodeKey) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parents.retain(|p| *p != parent);
        }
    }

    fn notify(&self, parent: NodeKey, child: NodeKey, op: ChildOp) {
        let Some(composite) = self.nodes.get(parent).and_then(|n| n.composite()) else {
            return;
        };
        for listener in composite.listeners() {
            listener(parent, child, op);
        }
    }

    /// Appends `child` to `parent`. Returns `Ok(false)` if it is already there.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<bool> {
        self.check_link(parent, child)?;
        let Some(composite) = self.nodes.get_mut(parent).and_then(|n| n.composite.as_mut()) else {
            return Err(GraphError::NodeNotFound(parent));
        };
        if composite.contains(child) {
            return Ok(false);
        }
        composite.push(child);
        self.add_back_ref(child, parent);
        self.notify(parent, child, ChildOp::Add);
        Ok(true)
    }

    /// Installs `child` at `index`, returning the node it replaced.
    ///
    /// An out-of-range index appends like [`add_child`](Self::add_child) and
    /// returns `None`. So does a `child` that is already at `index`, or
    /// already elsewhere in the list (which is left untouched).
    pub fn set_child(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        index: usize,
    ) -> Result<Option<NodeKey>> {
        self.check_link(parent, child)?;
        let Some(composite) = self.nodes.get_mut(parent).and_then(|n| n.composite.as_mut()) else {
            return Err(GraphError::NodeNotFound(parent));
        };
        if index >= composite.len() {
            self.add_child(parent, child)?;
            return Ok(None);
        }
        match composite.position(child) {
            Some(i) if i == index => return Ok(None),
            Some(i) => {
                log::warn!("set_child: {child:?} already at index {i} of {parent:?}, ignored");
                return Ok(None);
            }
            None => {}
        }

        let previous = composite.replace(index, child);
        self.remove_back_ref(previous, parent);
        self.add_back_ref(child, parent);
        self.notify(parent, child, ChildOp::Change);
        Ok(Some(previous))
    }

    /// Detaches `child` from `parent`. The child itself stays in the arena.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        let removed = self
            .nodes
            .get_mut(parent)
            .and_then(|n| n.composite.as_mut())
            .is_some_and(|c| c.remove(child));
        if removed {
            self.remove_back_ref(child, parent);
            self.notify(parent, child, ChildOp::Delete);
        }
        removed
    }

    /// Detaches up to `count` children starting at `start`.
    ///
    /// The range is clamped to the child list without error; a `start` past
    /// the end removes nothing.
    pub fn remove_children(&mut self, parent: NodeKey, start: usize, count: usize) -> Vec<NodeKey> {
        let Some(composite) = self.nodes.get_mut(parent).and_then(|n| n.composite.as_mut()) else {
            return Vec::new();
        };
        if start.saturating_add(count) > composite.len() {
            log::debug!(
                "remove_children({start}, {count}) clamped to {} children",
                composite.len()
            );
        }
        let removed = composite.drain(start, count);
        for &child in &removed {
            self.remove_back_ref(child, parent);
            self.notify(parent, child, ChildOp::Delete);
        }
        removed
    }

    pub fn add_child_listener(&mut self, parent: NodeKey, listener: ChildListener) -> Result<()> {
        self.check_composite(parent)?;
        if let Some(composite) = self.nodes.get_mut(parent).and_then(|n| n.composite.as_mut()) {
            composite.add_listener(listener);
        }
        Ok(())
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Takes a node out of the arena, breaking every link to and from it.
    ///
    /// Children are detached, not removed.
    pub fn remove(&mut self, key: NodeKey) -> Option<Node> {
        let parents = self.nodes.get(key)?.parents().to_vec();
        for parent in parents {
            self.remove_child(parent, key);
        }
        let children = self.nodes.get(key).map(|n| n.children().to_vec()).unwrap_or_default();
        for child in children {
            self.remove_child(key, child);
        }

        let node = self.nodes.remove(key)?;
        self.order.retain(|k| *k != key);
        self.ids.remove(&node.id());
        if let Some(drawable) = node.as_drawable() {
            self.entities.remove(&drawable.entity());
        }
        Some(node)
    }

    /// Removes every node, handing them back in insertion order.
    pub fn drain(&mut self) -> Vec<Node> {
        self.ids.clear();
        self.entities.clear();
        let order = std::mem::take(&mut self.order);
        order.into_iter().filter_map(|k| self.nodes.remove(k)).collect()
    }

    pub(crate) fn clear_dirty(&mut self) {
        for node in self.nodes.values_mut() {
            node.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_breaks_links_both_ways() {
        let mut arena = NodeArena::new();
        let a = arena.insert(Node::group("a")).unwrap();
        let b = arena.insert(Node::group("b")).unwrap();
        let c = arena.insert(Node::group("c")).unwrap();
        arena.add_child(a, b).unwrap();
        arena.add_child(b, c).unwrap();

        let removed = arena.remove(b).unwrap();
        assert_eq!(removed.name(), "b");
        assert!(arena.get(a).unwrap().children().is_empty());
        assert!(arena.get(c).unwrap().parents().is_empty());
        assert_eq!(arena.keys(), &[a, c]);
    }

    #[test]
    fn diamond_is_allowed_but_cycle_is_not() {
        let mut arena = NodeArena::new();
        let root = arena.insert(Node::group("root")).unwrap();
        let left = arena.insert(Node::group("left")).unwrap();
        let right = arena.insert(Node::group("right")).unwrap();
        let shared = arena.insert(Node::group("shared")).unwrap();

        arena.add_child(root, left).unwrap();
        arena.add_child(root, right).unwrap();
        arena.add_child(left, shared).unwrap();
        arena.add_child(right, shared).unwrap();
        assert_eq!(arena.get(shared).unwrap().parents(), &[left, right]);

        assert!(arena.is_ancestor(root, shared));
        assert!(matches!(
            arena.add_child(shared, root),
            Err(GraphError::CycleDetected { .. })
        ));
        assert!(matches!(
            arena.add_child(shared, shared),
            Err(GraphError::CycleDetected { .. })
        ));
    }
}
