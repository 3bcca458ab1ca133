//! API request handlers

pub mod admin;
pub mod auth;
pub mod evaluations;
pub mod media;
pub mod profile;
