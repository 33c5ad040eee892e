//! An HTTP service for items that can be liked and commented on.

pub mod feature;
pub mod infra;
pub mod server;
