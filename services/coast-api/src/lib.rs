//! Coastal environmental-quality API service.
//!
//! Serves daily snapshot series per location, exposes the authenticated
//! refresh trigger, and hosts the periodic midnight refresh loop.

pub mod server;
pub mod sources;
pub mod state;
