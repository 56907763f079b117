pub mod customer_activity;
pub mod customer_activity_price;
pub mod order;

pub use customer_activity::{
    ActivityType, Entity as CustomerActivity, Model as CustomerActivityModel,
};
pub use customer_activity_price::{Entity as CustomerActivityPrice, Model as PriceTier};
pub use order::{Entity as Order, Model as OrderModel};
