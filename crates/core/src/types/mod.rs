//! Core types for Sokoni.
//!
//! These mirror the JSON shapes of the REST backend plus the one shape the
//! console owns itself (the persisted cart line).

pub mod cart;
pub mod page;
pub mod product;
pub mod user;

pub use cart::CartLine;
pub use page::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, ProductPage, total_pages};
pub use product::Product;
pub use user::{NewUser, ProfileUpdate, UserProfile};
