pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use context::{ContextSnapshot, WorkflowContext};
pub use error::{GatehouseError, Result};
pub use event::{WorkflowEvent, WorkflowEventBus};
pub use traits::Agent;
pub use types::*;
