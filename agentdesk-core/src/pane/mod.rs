//! Pane layout

mod shared;
mod tree;

pub use shared::SharedLayout;
pub use tree::{PaneLeaf, PaneTree};
