//! Identifier and value types shared by the store and domain crates.

pub mod ids;
pub mod money;

pub use ids::{CouponId, LineItemId, OrderId, ProfileId, PromotionId, StoreId, UserId};
pub use money::Money;
