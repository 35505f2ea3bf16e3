pub mod error;
pub mod config;
pub mod model;
pub mod forms;
pub mod compiler;
pub mod runtime;

pub use error::{FlowError, FlowResult};
