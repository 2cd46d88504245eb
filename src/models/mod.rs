//! Database rows, response views and request bodies
pub mod cart;
pub mod category;
pub mod product;
pub mod promotion;
pub mod review;
pub mod user;
