//! Offline page backend.
//!
//! [`ReplayPage`] implements [`PageInspector`](crate::services::PageInspector) over a
//! recorded [`Fixture`], so runs can be rehearsed and tested without a browser.

pub mod fixture;
pub mod page;

pub use fixture::{AccountFixture, ActionMode, Fixture};
pub use page::{ReplayCounters, ReplayPage};
