pub mod agent;
pub mod role;
pub mod templates;

pub use agent::{Agent, TeamInputs};
pub use role::Role;
