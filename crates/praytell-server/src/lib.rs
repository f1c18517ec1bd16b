//! HTTP surface for PrayTell

pub mod rest;
pub mod types;

pub use rest::{AppError, AppState, create_router};
pub use types::*;
