//! Core types shared across the pipeline: the typed error enum and the
//! user-facing error display layer.

pub mod error;

pub use error::{AtriumError, ErrorContext, user_friendly_error};
