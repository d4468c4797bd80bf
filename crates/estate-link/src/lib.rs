//! Marketplace domain library: configuration, telemetry, typed errors, the
//! Supabase backend adapter, and the identity/credits/listings services with
//! their HTTP routers.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod supabase;
pub mod telemetry;
