//! Document query scheduling
//!
//! - [`DocQueryScheduler`] - defers a document query until discovery settles
//! - [`StalenessPolicy`] - lookback window gated by [`FeatureFlags`]

pub mod flags;
pub mod scheduler;

pub use flags::FeatureFlags;
pub use scheduler::{DocQueryOptions, DocQuerySchedule, DocQueryScheduler, StalenessPolicy};
