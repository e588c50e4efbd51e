//! Domain model module declarations.

pub mod item;
pub mod review;
