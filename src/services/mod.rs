// Pricing
pub mod price_tiers;

// Catalog and instance lifecycle
pub mod activity_catalog;
pub mod customer_activities;

pub use activity_catalog::{ActivityCatalogService, NewActivityDefinition};
pub use customer_activities::{
    ActivityInstanceUpdate, AvailableActivity, CustomerActivityService, NewActivityInstance,
};
pub use price_tiers::{NewPriceTier, PriceQuote, PriceTierService};
