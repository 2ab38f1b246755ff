//! Domain types for the factor engine.
//!
//! All entities are transient value objects: built from caller-supplied
//! series, never mutated in place.

pub mod bar;
pub mod moneyflow;
pub mod snapshot;

pub use bar::{Bar, PriceSeries};
pub use moneyflow::{MoneyflowBar, MoneyflowSeries};
pub use snapshot::{Fundamentals, IndustryFlowRow, SnapshotRow};

/// Symbol type alias
pub type Symbol = String;
