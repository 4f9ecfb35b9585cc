pub mod agent_registry;

pub use agent_registry::{AgentRegistry, RegistryError, Resolved};
