pub mod config;
pub mod error;
pub mod graph;
pub mod jsonld;
pub mod logging;
pub mod matcher;
pub mod metrics;
pub mod model;
pub mod paths;
pub mod schema;
pub mod server;
pub mod service;
pub mod shacl;
pub mod state;
pub mod store;
pub mod validator;

pub use config::{CliArgs, ServerConfig};
pub use error::{Result, ValidatorError};
pub use logging::{LoggingConfig, init_logging};
pub use server::run_server;
pub use service::ValidatorService;
pub use state::AppState;
