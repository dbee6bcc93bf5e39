//! Binary split tree of panes
//!
//! Nodes live in an arena keyed by [`PaneId`] with parent links, so
//! splitting and collapsing are a handful of id rewrites. Every mutator
//! works on a copy and returns the new tree; a tree value is never
//! changed after it has been handed out.

use std::collections::HashMap;

use agentdesk_protocol::{
    clamp_ratio, PaneId, PaneNode, SessionId, SplitDirection, DEFAULT_SPLIT_RATIO,
    MAX_SPLIT_RATIO, MIN_SPLIT_RATIO,
};
use agentdesk_utils::{AgentdeskError, Result};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Leaf {
        session_id: Option<SessionId>,
    },
    Split {
        direction: SplitDirection,
        ratio: f32,
        first: PaneId,
        second: PaneId,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct NodeRecord {
    parent: Option<PaneId>,
    kind: NodeKind,
}

impl NodeRecord {
    fn leaf(parent: Option<PaneId>, session_id: Option<SessionId>) -> Self {
        Self {
            parent,
            kind: NodeKind::Leaf { session_id },
        }
    }
}

/// A leaf as seen from outside the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaneLeaf {
    pub id: PaneId,
    pub session_id: Option<SessionId>,
}

/// Layout of panes
///
/// Always holds at least one leaf, and the active pane is always a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneTree {
    nodes: HashMap<PaneId, NodeRecord>,
    root: PaneId,
    active_pane_id: PaneId,
}

impl Default for PaneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PaneTree {
    /// A single unbound leaf, which is also the active pane
    pub fn new() -> Self {
        Self::single(PaneId::new(), None)
    }

    /// A single leaf bound to `session_id`
    pub fn with_session(session_id: SessionId) -> Self {
        Self::single(PaneId::new(), Some(session_id))
    }

    fn single(id: PaneId, session_id: Option<SessionId>) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(id, NodeRecord::leaf(None, session_id));
        Self {
            nodes,
            root: id,
            active_pane_id: id,
        }
    }

    // ==================== Queries ====================

    pub fn root_id(&self) -> PaneId {
        self.root
    }

    pub fn active_pane_id(&self) -> PaneId {
        self.active_pane_id
    }

    pub fn active_leaf(&self) -> PaneLeaf {
        PaneLeaf {
            id: self.active_pane_id,
            session_id: self.session_of(self.active_pane_id),
        }
    }

    pub fn contains(&self, id: PaneId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn is_leaf(&self, id: PaneId) -> bool {
        matches!(
            self.nodes.get(&id),
            Some(NodeRecord {
                kind: NodeKind::Leaf { .. },
                ..
            })
        )
    }

    pub fn leaf(&self, id: PaneId) -> Option<PaneLeaf> {
        match self.nodes.get(&id)?.kind {
            NodeKind::Leaf { session_id } => Some(PaneLeaf { id, session_id }),
            NodeKind::Split { .. } => None,
        }
    }

    /// Session bound to a leaf, if any
    pub fn session_of(&self, id: PaneId) -> Option<SessionId> {
        self.leaf(id).and_then(|leaf| leaf.session_id)
    }

    pub fn parent(&self, id: PaneId) -> Option<PaneId> {
        self.nodes.get(&id)?.parent
    }

    /// Ratio of a split node
    pub fn ratio(&self, split_id: PaneId) -> Option<f32> {
        match self.nodes.get(&split_id)?.kind {
            NodeKind::Split { ratio, .. } => Some(ratio),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Leaves in pre-order (first child before second)
    pub fn leaves(&self) -> Vec<PaneLeaf> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            match node.kind {
                NodeKind::Leaf { session_id } => leaves.push(PaneLeaf { id, session_id }),
                NodeKind::Split { first, second, .. } => {
                    stack.push(second);
                    stack.push(first);
                }
            }
        }

        leaves
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node.kind, NodeKind::Leaf { .. }))
            .count()
    }

    /// Total number of nodes, splits included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First leaf in pre-order
    pub fn leftmost_leaf(&self) -> PaneLeaf {
        self.leftmost_below(self.root)
    }

    fn leftmost_below(&self, mut id: PaneId) -> PaneLeaf {
        loop {
            match self.nodes.get(&id).map(|node| &node.kind) {
                Some(NodeKind::Split { first, .. }) => id = *first,
                Some(NodeKind::Leaf { session_id }) => {
                    return PaneLeaf {
                        id,
                        session_id: *session_id,
                    }
                }
                None => {
                    return PaneLeaf {
                        id,
                        session_id: None,
                    }
                }
            }
        }
    }

    /// Nested view of the tree
    pub fn snapshot(&self) -> PaneNode {
        self.snapshot_node(self.root)
    }

    fn snapshot_node(&self, id: PaneId) -> PaneNode {
        match self.nodes.get(&id).map(|node| &node.kind) {
            Some(NodeKind::Split {
                direction,
                ratio,
                first,
                second,
            }) => PaneNode::Split {
                id,
                direction: *direction,
                ratio: *ratio,
                children: Box::new([self.snapshot_node(*first), self.snapshot_node(*second)]),
            },
            Some(NodeKind::Leaf { session_id }) => PaneNode::Leaf {
                id,
                session_id: *session_id,
            },
            None => PaneNode::Leaf {
                id,
                session_id: None,
            },
        }
    }

    // ==================== Mutators ====================

    /// Split a leaf in two
    ///
    /// The leaf keeps its id and binding as the first child; the second
    /// child is a new unbound leaf. Unknown ids and split nodes leave the
    /// tree unchanged. The active pane does not move.
    #[must_use]
    pub fn split(&self, pane_id: PaneId, direction: SplitDirection) -> Self {
        if !self.is_leaf(pane_id) {
            debug!(pane_id = %pane_id, "split on missing leaf ignored");
            return self.clone();
        }

        let mut next = self.clone();
        let parent = next.nodes.get(&pane_id).and_then(|node| node.parent);
        let split_id = PaneId::new();
        let new_leaf_id = PaneId::new();

        next.nodes
            .insert(new_leaf_id, NodeRecord::leaf(Some(split_id), None));
        next.nodes.insert(
            split_id,
            NodeRecord {
                parent,
                kind: NodeKind::Split {
                    direction,
                    ratio: DEFAULT_SPLIT_RATIO,
                    first: pane_id,
                    second: new_leaf_id,
                },
            },
        );
        if let Some(node) = next.nodes.get_mut(&pane_id) {
            node.parent = Some(split_id);
        }
        next.replace_child(parent, pane_id, split_id);

        next
    }

    /// Close a leaf, promoting its sibling into the parent's place
    ///
    /// Refused when only one leaf remains. If the closed leaf was active,
    /// the leftmost leaf of the result becomes active.
    #[must_use]
    pub fn close(&self, pane_id: PaneId) -> Self {
        if !self.is_leaf(pane_id) {
            debug!(pane_id = %pane_id, "close on missing leaf ignored");
            return self.clone();
        }
        if self.leaf_count() <= 1 {
            debug!(pane_id = %pane_id, "refusing to close the last pane");
            return self.clone();
        }

        let Some(parent_id) = self.parent(pane_id) else {
            return self.clone();
        };
        let Some(sibling_id) = self.sibling_of(parent_id, pane_id) else {
            return self.clone();
        };

        let mut next = self.clone();
        let grandparent = next.parent(parent_id);

        next.nodes.remove(&pane_id);
        next.nodes.remove(&parent_id);
        if let Some(sibling) = next.nodes.get_mut(&sibling_id) {
            sibling.parent = grandparent;
        }
        next.replace_child(grandparent, parent_id, sibling_id);

        if next.active_pane_id == pane_id {
            next.active_pane_id = next.leftmost_leaf().id;
        }

        next
    }

    /// Set a split's ratio, clamped to the allowed range
    #[must_use]
    pub fn set_ratio(&self, split_id: PaneId, ratio: f32) -> Self {
        let mut next = self.clone();
        match next.nodes.get_mut(&split_id).map(|node| &mut node.kind) {
            Some(NodeKind::Split { ratio: current, .. }) => *current = clamp_ratio(ratio),
            _ => debug!(pane_id = %split_id, "set_ratio on missing split ignored"),
        }
        next
    }

    /// Bind a leaf to a session, or unbind it with `None`
    ///
    /// The session id is not checked against any registry.
    #[must_use]
    pub fn set_pane_session(&self, pane_id: PaneId, session_id: Option<SessionId>) -> Self {
        let mut next = self.clone();
        match next.nodes.get_mut(&pane_id).map(|node| &mut node.kind) {
            Some(NodeKind::Leaf { session_id: bound }) => *bound = session_id,
            _ => debug!(pane_id = %pane_id, "set_pane_session on missing leaf ignored"),
        }
        next
    }

    /// Make a leaf the active pane
    pub fn set_active(&self, pane_id: PaneId) -> Result<Self> {
        if !self.is_leaf(pane_id) {
            return Err(AgentdeskError::UnknownPane(pane_id.to_string()));
        }
        let mut next = self.clone();
        next.active_pane_id = pane_id;
        Ok(next)
    }

    /// Collapse to a single leaf carrying the leftmost leaf's id and binding
    #[must_use]
    pub fn reset(&self) -> Self {
        let leftmost = self.leftmost_leaf();
        Self::single(leftmost.id, leftmost.session_id)
    }

    // ==================== Internals ====================

    fn sibling_of(&self, parent_id: PaneId, child: PaneId) -> Option<PaneId> {
        match self.nodes.get(&parent_id)?.kind {
            NodeKind::Split { first, second, .. } if first == child => Some(second),
            NodeKind::Split { first, second, .. } if second == child => Some(first),
            _ => None,
        }
    }

    /// Point `parent` (or the root) at `new` where it pointed at `old`
    fn replace_child(&mut self, parent: Option<PaneId>, old: PaneId, new: PaneId) {
        let Some(parent_id) = parent else {
            self.root = new;
            return;
        };
        if let Some(NodeKind::Split { first, second, .. }) =
            self.nodes.get_mut(&parent_id).map(|node| &mut node.kind)
        {
            if *first == old {
                *first = new;
            } else if *second == old {
                *second = new;
            }
        }
    }

    /// Check the structural invariants of the arena
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(AgentdeskError::internal(message));

        match self.nodes.get(&self.root) {
            None => return fail(format!("root {} missing", self.root)),
            Some(node) if node.parent.is_some() => {
                return fail(format!("root {} has a parent", self.root))
            }
            Some(_) => {}
        }

        let mut seen = 0usize;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            seen += 1;
            if seen > self.nodes.len() {
                return fail("cycle in pane tree".to_string());
            }
            let Some(node) = self.nodes.get(&id) else {
                return fail(format!("dangling child {}", id));
            };
            if let NodeKind::Split {
                ratio,
                first,
                second,
                ..
            } = node.kind
            {
                if !(MIN_SPLIT_RATIO..=MAX_SPLIT_RATIO).contains(&ratio) {
                    return fail(format!("split {} ratio {} out of range", id, ratio));
                }
                if first == second {
                    return fail(format!("split {} has identical children", id));
                }
                for child in [first, second] {
                    if self.nodes.get(&child).and_then(|c| c.parent) != Some(id) {
                        return fail(format!("child {} does not point back to {}", child, id));
                    }
                    stack.push(child);
                }
            }
        }

        if seen != self.nodes.len() {
            return fail(format!(
                "{} nodes unreachable from root",
                self.nodes.len() - seen
            ));
        }
        if !self.is_leaf(self.active_pane_id) {
            return fail(format!("active pane {} is not a leaf", self.active_pane_id));
        }

        Ok(())
    }
}
