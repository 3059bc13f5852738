//! Core types shared across the SDK

pub mod error;

pub use error::{RecallError, RecallResult};
