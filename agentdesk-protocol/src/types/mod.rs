pub mod event;
pub mod pane;
pub mod session;

pub use event::*;
pub use pane::*;
pub use session::*;
