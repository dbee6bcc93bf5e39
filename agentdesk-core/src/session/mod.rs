//! Session tracking
//!
//! Hierarchy: SharedRegistry -> SessionRegistry -> Session

mod registry;
#[allow(clippy::module_inception)]
mod session;
mod shared;

pub use registry::{SessionRegistry, StatusSummary};
pub use session::Session;
pub use shared::SharedRegistry;
