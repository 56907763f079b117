//! Activity pricing library
//!
//! Tiered, time-bounded customer pricing for billable activities, the
//! lifecycle of activity instances on orders, and per-activity statistics.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod models;
pub mod queries;
pub mod services;

pub mod prelude {
    pub use crate::entities::{ActivityType, PriceTier};
    pub use crate::errors::ServiceError;
    pub use crate::events::{Event, EventSender};
    pub use crate::models::{ActivityDefinition, ActivityInstance, ActivityRecord};
    pub use crate::queries::activity_statistics_queries::{
        ActivityStatistics, ActivitySummary, StatisticsOptions,
    };
    pub use crate::services::{
        ActivityCatalogService, ActivityInstanceUpdate, AvailableActivity,
        CustomerActivityService, NewActivityDefinition, NewActivityInstance, NewPriceTier,
        PriceQuote, PriceTierService,
    };
}
