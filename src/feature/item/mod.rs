//! Items with likes and comments.

pub mod item_api;
pub mod item_repository;
pub mod item_service;
