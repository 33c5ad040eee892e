//! The features of the application, one module each.

pub mod health;
pub mod item;
