//! Data models for the cleaner.
//!
//! This module contains the data structures shared by the engine:
//! - [`EntityRef`], [`PageKind`], [`Location`]: what the list walker finds and where the page is
//! - [`AttributeSnapshot`]: extracted attributes for one entity
//! - [`CriteriaConfig`]: normalised removal criteria for one run
//! - [`RunState`]: kept/removed counters for one run
//! - [`UserConfig`]: settings persisted in `Cleaner Settings.yaml`

pub mod attributes;
pub mod config;
pub mod criteria;
pub mod entity;
pub mod run_state;

pub use attributes::{AttributeSnapshot, HoverStats, ProfileStats};
pub use config::{CriteriaSettings, LoggingSettings, TimingSettings, UserConfig};
pub use criteria::{CriteriaConfig, RequiredFields};
pub use entity::{ElementHandle, EntityRef, Location, PageKind};
pub use run_state::RunState;
