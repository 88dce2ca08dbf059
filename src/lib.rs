// Audience Cleaner - automated pruning of follower and following lists
//
// This is the library crate containing the engine, its configuration and the
// offline replay backend. The binary crate (main.rs) provides the CLI entry point.

pub mod config;
pub mod controller;
pub mod logging;
pub mod models;
pub mod replay;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use controller::{RunController, RunReport, Termination, Worker};
pub use models::{CriteriaConfig, PageKind, UserConfig};
pub use services::{PageInspector, Verdict};
pub use state::{RunEvent, RunMonitor};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
