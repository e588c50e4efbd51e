#![forbid(unsafe_code)]

//! Spaced-repetition resurfacing of saved posts into a scrolling feed.
//!
//! [`review`] computes when a saved item is due again; [`feed`] decides
//! which due items to insert into a live view, where, and when.

pub mod config;
pub mod errors;
pub mod feed;
pub mod models;
pub mod persistence;
pub mod review;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
