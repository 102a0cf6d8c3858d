//! # meter-core
//!
//! Core crate for the audience meter. Contains the configuration schema and
//! loader, and the unified error system shared by every other crate.
//!
//! This crate has **no** internal dependencies on other meter crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
