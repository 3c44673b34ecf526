pub mod agent;
pub mod error;
pub mod panel;
pub mod role;

pub use agent::{run, Agent};
pub use error::AgentError;
pub use panel::{Panel, PanelReport};
pub use role::{AgentInput, Role, TeamReports};
