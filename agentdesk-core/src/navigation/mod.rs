//! Keyboard navigation over sessions and panes
//!
//! The controller keeps no state of its own. Each [`NavCommand`] reads the
//! current registry and layout and publishes at most one new value of each.

mod keymap;

pub use keymap::{parse_binding, parse_modifiers, KeyBinding, Keymap, ParseBindingError};

use agentdesk_protocol::{SessionId, SplitDirection};
use agentdesk_utils::AgentdeskError;
use tracing::debug;

use crate::pane::SharedLayout;
use crate::session::{SessionRegistry, SharedRegistry};

/// Direction for session cycling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleDirection {
    Forward,
    Backward,
}

/// A navigation command produced by the keymap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavCommand {
    /// Ask the application to start its new-session flow
    NewSession,
    CycleSession(CycleDirection),
    /// Zero-based; indexes past the end go to the last session
    JumpToSession(usize),
    /// Split the active pane
    Split(SplitDirection),
    CloseActivePane,
    /// Zero-based pre-order leaf index; out of range is ignored
    FocusPane(usize),
}

/// What a command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// The caller should run its session creation flow
    NewSessionRequested,
    /// The session became active and is shown in the active pane
    SessionActivated(SessionId),
    LayoutChanged,
    /// Nothing to do (no sessions, last pane, index out of range)
    Ignored,
}

/// Index reached by cycling from `current` through `len` entries
///
/// With no current position, forward starts at the first entry and
/// backward at the last.
pub fn cycle_index(len: usize, current: Option<usize>, direction: CycleDirection) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let next = match (current, direction) {
        (Some(index), CycleDirection::Forward) => (index + 1) % len,
        (Some(index), CycleDirection::Backward) => (index + len - 1) % len,
        (None, CycleDirection::Forward) => 0,
        (None, CycleDirection::Backward) => len - 1,
    };
    Some(next)
}

/// Applies navigation commands to the shared registry and layout
#[derive(Debug, Clone)]
pub struct NavigationController {
    registry: SharedRegistry,
    layout: SharedLayout,
}

impl NavigationController {
    pub fn new(registry: SharedRegistry, layout: SharedLayout) -> Self {
        Self { registry, layout }
    }

    pub fn dispatch(&self, command: NavCommand) -> NavOutcome {
        debug!(command = ?command, "navigation command");
        match command {
            NavCommand::NewSession => NavOutcome::NewSessionRequested,
            NavCommand::CycleSession(direction) => self.cycle(direction),
            NavCommand::JumpToSession(index) => self.jump(index),
            NavCommand::Split(direction) => self.split(direction),
            NavCommand::CloseActivePane => self.close_active(),
            NavCommand::FocusPane(index) => self.focus(index),
        }
    }

    /// The session cycling starts from
    ///
    /// The active pane's session when it still exists, else the registry's
    /// active session.
    fn current_session(&self, registry: &SessionRegistry) -> Option<SessionId> {
        self.layout
            .load()
            .active_leaf()
            .session_id
            .filter(|id| registry.contains(*id))
            .or_else(|| registry.active_session_id())
    }

    fn cycle(&self, direction: CycleDirection) -> NavOutcome {
        let registry = self.registry.snapshot();
        let current = self
            .current_session(&registry)
            .and_then(|id| registry.position(id));

        match cycle_index(registry.len(), current, direction) {
            Some(index) => self.activate(registry.ids()[index]),
            None => NavOutcome::Ignored,
        }
    }

    fn jump(&self, index: usize) -> NavOutcome {
        let registry = self.registry.snapshot();
        match registry.ids().last() {
            Some(last) => {
                let id = registry.ids().get(index).copied().unwrap_or(*last);
                self.activate(id)
            }
            None => NavOutcome::Ignored,
        }
    }

    /// Make `id` the active session and show it in the active pane
    fn activate(&self, id: SessionId) -> NavOutcome {
        if let Err(e) = self.registry.set_active(id) {
            debug!(session_id = %id, error = %e, "session vanished before activation");
            return NavOutcome::Ignored;
        }
        self.layout
            .update(|tree| tree.set_pane_session(tree.active_pane_id(), Some(id)));
        NavOutcome::SessionActivated(id)
    }

    fn split(&self, direction: SplitDirection) -> NavOutcome {
        let before = self.layout.load();
        let after = self
            .layout
            .update(|tree| tree.split(tree.active_pane_id(), direction));
        Self::layout_outcome(before.leaf_count(), after.leaf_count())
    }

    fn close_active(&self) -> NavOutcome {
        let before = self.layout.load();
        let after = self.layout.update(|tree| tree.close(tree.active_pane_id()));
        Self::layout_outcome(before.leaf_count(), after.leaf_count())
    }

    fn layout_outcome(before: usize, after: usize) -> NavOutcome {
        if before == after {
            NavOutcome::Ignored
        } else {
            NavOutcome::LayoutChanged
        }
    }

    fn focus(&self, index: usize) -> NavOutcome {
        let result = self.layout.try_update(|tree| match tree.leaves().get(index) {
            Some(leaf) => tree.set_active(leaf.id),
            None => Err(AgentdeskError::UnknownPane(format!("pane index {}", index))),
        });

        match result {
            Ok(_) => NavOutcome::LayoutChanged,
            Err(e) => {
                debug!(index, error = %e, "focus index out of range");
                NavOutcome::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::PaneTree;
    use agentdesk_protocol::{CliTool, SessionConfig};

    fn setup(names: &[&str]) -> (NavigationController, SharedRegistry, SharedLayout, Vec<SessionId>) {
        let registry = SharedRegistry::new();
        let ids: Vec<SessionId> = names
            .iter()
            .map(|name| {
                registry
                    .add_session(SessionConfig::new(*name, CliTool::ClaudeCode))
                    .unwrap()
            })
            .collect();
        let layout = SharedLayout::new(match ids.first() {
            Some(id) => PaneTree::with_session(*id),
            None => PaneTree::new(),
        });
        let controller = NavigationController::new(registry.clone(), layout.clone());
        (controller, registry, layout, ids)
    }

    // ==================== Cycle Tests ====================

    #[test]
    fn test_cycle_index_wraps() {
        use CycleDirection::*;
        assert_eq!(cycle_index(3, Some(2), Forward), Some(0));
        assert_eq!(cycle_index(3, Some(0), Backward), Some(2));
        assert_eq!(cycle_index(3, None, Forward), Some(0));
        assert_eq!(cycle_index(3, None, Backward), Some(2));
        assert_eq!(cycle_index(0, None, Forward), None);
    }

    #[test]
    fn test_cycle_forward_wraps_through_insertion_order() {
        let (controller, registry, layout, ids) = setup(&["A", "B", "C"]);
        let forward = NavCommand::CycleSession(CycleDirection::Forward);

        for expected in [ids[1], ids[2], ids[0]] {
            assert_eq!(controller.dispatch(forward), NavOutcome::SessionActivated(expected));
            assert_eq!(registry.active_session_id(), Some(expected));
            assert_eq!(layout.load().active_leaf().session_id, Some(expected));
        }
    }

    #[test]
    fn test_cycle_backward() {
        let (controller, registry, _, ids) = setup(&["A", "B", "C"]);
        controller.dispatch(NavCommand::CycleSession(CycleDirection::Backward));
        assert_eq!(registry.active_session_id(), Some(ids[2]));
    }

    #[test]
    fn test_cycle_follows_active_pane_binding() {
        let (controller, registry, layout, ids) = setup(&["A", "B", "C"]);
        layout.update(|tree| tree.set_pane_session(tree.active_pane_id(), Some(ids[1])));

        controller.dispatch(NavCommand::CycleSession(CycleDirection::Forward));
        assert_eq!(registry.active_session_id(), Some(ids[2]));
    }

    #[test]
    fn test_cycle_skips_stale_pane_binding() {
        let (controller, registry, layout, ids) = setup(&["A", "B", "C"]);
        layout.update(|tree| tree.set_pane_session(tree.active_pane_id(), Some(SessionId::new())));
        registry.set_active(ids[1]).unwrap();

        controller.dispatch(NavCommand::CycleSession(CycleDirection::Forward));
        assert_eq!(registry.active_session_id(), Some(ids[2]));
    }

    #[test]
    fn test_cycle_with_no_sessions_ignored() {
        let (controller, _, _, _) = setup(&[]);
        assert_eq!(
            controller.dispatch(NavCommand::CycleSession(CycleDirection::Forward)),
            NavOutcome::Ignored
        );
    }

    // ==================== Jump Tests ====================

    #[test]
    fn test_jump_to_index() {
        let (controller, registry, layout, ids) = setup(&["A", "B", "C"]);
        controller.dispatch(NavCommand::JumpToSession(1));
        assert_eq!(registry.active_session_id(), Some(ids[1]));
        assert_eq!(layout.load().active_leaf().session_id, Some(ids[1]));
    }

    #[test]
    fn test_jump_clamps_past_end() {
        let (controller, registry, _, ids) = setup(&["A", "B"]);
        assert_eq!(
            controller.dispatch(NavCommand::JumpToSession(8)),
            NavOutcome::SessionActivated(ids[1])
        );
        assert_eq!(registry.active_session_id(), Some(ids[1]));
    }

    #[test]
    fn test_jump_with_no_sessions_ignored() {
        let (controller, _, _, _) = setup(&[]);
        assert_eq!(controller.dispatch(NavCommand::JumpToSession(0)), NavOutcome::Ignored);
    }

    // ==================== Layout Tests ====================

    #[test]
    fn test_split_and_close_active() {
        let (controller, _, layout, ids) = setup(&["A"]);

        assert_eq!(
            controller.dispatch(NavCommand::Split(SplitDirection::Horizontal)),
            NavOutcome::LayoutChanged
        );
        assert_eq!(layout.load().leaf_count(), 2);

        assert_eq!(controller.dispatch(NavCommand::FocusPane(1)), NavOutcome::LayoutChanged);
        assert_eq!(controller.dispatch(NavCommand::CloseActivePane), NavOutcome::LayoutChanged);

        let tree = layout.load();
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.active_leaf().session_id, Some(ids[0]));
    }

    #[test]
    fn test_close_last_pane_ignored() {
        let (controller, _, layout, _) = setup(&["A"]);
        assert_eq!(controller.dispatch(NavCommand::CloseActivePane), NavOutcome::Ignored);
        assert_eq!(layout.load().leaf_count(), 1);
    }

    #[test]
    fn test_focus_out_of_range_ignored() {
        let (controller, _, layout, _) = setup(&["A"]);
        let before = layout.load().active_pane_id();
        assert_eq!(controller.dispatch(NavCommand::FocusPane(5)), NavOutcome::Ignored);
        assert_eq!(layout.load().active_pane_id(), before);
    }

    #[test]
    fn test_focus_uses_pre_order() {
        let (controller, _, layout, _) = setup(&["A"]);
        controller.dispatch(NavCommand::Split(SplitDirection::Vertical));
        controller.dispatch(NavCommand::Split(SplitDirection::Horizontal));

        controller.dispatch(NavCommand::FocusPane(2));
        let tree = layout.load();
        assert_eq!(tree.active_pane_id(), tree.leaves()[2].id);
    }

    #[test]
    fn test_new_session_is_requested() {
        let (controller, registry, _, _) = setup(&["A"]);
        assert_eq!(
            controller.dispatch(NavCommand::NewSession),
            NavOutcome::NewSessionRequested
        );
        assert_eq!(registry.list().len(), 1);
    }
}
