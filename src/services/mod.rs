//! Services module - the traversal, extraction, decision and action engine.
//!
//! Everything here talks to the page only through the [`PageInspector`] capability
//! trait, so the same engine runs against a live browser bridge or an offline replay.
//!
//! # Components
//!
//! - [`ListWalker`]: cursor over the virtualised list; finds the next visible entity,
//!   scrolls when nothing new is rendered and declares the end of the list.
//! - [`AttributeExtractor`]: hover-card, profile and about-view probes with bounded
//!   retries; missing data becomes "unknown" instead of an error.
//! - [`DecisionEngine`]: pure keep/remove policy with a fixed rule precedence.
//! - [`ActionExecutor`]: remove-follower or unfollow, or a logged dry run.
//! - [`Pacer`]: every delay and poll, raced against the run's cancellation signal.
//! - [`Navigator`]: verified forward/back navigation that always returns to the list.
//! - [`TextPatterns`]: parsing of counts, bios, countries and post totals.

pub mod action;
pub mod decision;
pub mod extraction;
pub mod inspector;
pub mod navigation;
pub mod pacing;
pub mod parsing;
pub mod walker;

pub use action::{ActionExecutor, ActionOutcome, ActionSteps, ActionStrategy, RemoveFollower, Unfollow};
pub use decision::{DecisionEngine, KeepReason, Trigger, Verdict};
pub use extraction::{AttributeExtractor, Checkpoint, Extracted, Stage};
pub use inspector::{HoverCard, InspectorError, PageInspector, ScrollStep, Subpage, TimestampScope};
pub use navigation::Navigator;
pub use pacing::{CancelHandle, CancelToken, Flow, Pacer, Wait, cancellation};
pub use parsing::TextPatterns;
pub use walker::{ListWalker, Probe, SeekOutcome, Walk};
