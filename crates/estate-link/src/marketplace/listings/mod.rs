//! Pass-through CRUD over the property listings table.

pub mod catalog;
pub mod router;
pub mod service;

pub use catalog::ListingStore;
pub use router::listings_router;
pub use service::ListingCatalog;
