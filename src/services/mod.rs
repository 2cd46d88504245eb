//! Business operations over the database, one module per resource
pub mod auth;
pub mod cart;
pub mod categories;
pub mod coupons;
pub mod events;
pub mod products;
pub mod promotions;
pub mod reviews;
pub mod upload;
pub mod users;
pub mod variants;
