// Library root module for sealed-aggr
// This file defines the public API and module structure for the sealed-aggr
// library: MEV-protected multi-venue swap routing with commit-reveal.

pub mod config;
pub mod control;
pub mod custody;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod router;
pub mod venues;
