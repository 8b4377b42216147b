//! Document models: one module per document kind, each wiring its own
//! shared/private state, action enums, and error family into the engine
//! through [`crate::domain::DocumentModel`].

mod compliance;
mod offering;
mod provisioning;
mod workplan;

pub use compliance::*;
pub use offering::*;
pub use provisioning::*;
pub use workplan::*;
