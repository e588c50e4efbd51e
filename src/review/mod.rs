//! Review scheduling: pure interval arithmetic and its store-backed service.

pub mod scheduler;
pub mod service;

pub use scheduler::{is_due, now_ms, Scheduler, TimeScale, ONE_DAY, ONE_YEAR};
pub use service::ReviewService;
