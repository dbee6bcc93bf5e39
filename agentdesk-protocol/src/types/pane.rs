use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::session::SessionId;

/// Smallest share a split may give its first child
pub const MIN_SPLIT_RATIO: f32 = 0.15;

/// Largest share a split may give its first child
pub const MAX_SPLIT_RATIO: f32 = 0.85;

/// Ratio of a freshly created split
pub const DEFAULT_SPLIT_RATIO: f32 = 0.5;

/// Clamp a split ratio into `[MIN_SPLIT_RATIO, MAX_SPLIT_RATIO]`
///
/// NaN has no meaningful position and maps to the default ratio.
pub fn clamp_ratio(ratio: f32) -> f32 {
    if ratio.is_nan() {
        DEFAULT_SPLIT_RATIO
    } else {
        ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO)
    }
}

// ==================== Pane Id ====================

/// Identifier of a pane tree node (leaf or split)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaneId(Uuid);

impl PaneId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PaneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for PaneId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ==================== Split Direction ====================

/// Split direction
///
/// `Horizontal` places the children side by side (left/right),
/// `Vertical` stacks them (top/bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

// ==================== Pane Node ====================

/// Nested view of a pane tree, for renderers and serialization
///
/// The first child of a split is "before" (left/top), the second is
/// "after" (right/bottom).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaneNode {
    Leaf {
        id: PaneId,
        #[serde(rename = "sessionId")]
        session_id: Option<SessionId>,
    },
    Split {
        id: PaneId,
        direction: SplitDirection,
        ratio: f32,
        children: Box<[PaneNode; 2]>,
    },
}

impl PaneNode {
    pub fn id(&self) -> PaneId {
        match self {
            PaneNode::Leaf { id, .. } | PaneNode::Split { id, .. } => *id,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PaneNode::Leaf { .. })
    }

    /// Number of leaves below (and including) this node
    pub fn leaf_count(&self) -> usize {
        match self {
            PaneNode::Leaf { .. } => 1,
            PaneNode::Split { children, .. } => children.iter().map(PaneNode::leaf_count).sum(),
        }
    }
}
