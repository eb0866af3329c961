//! Common utilities module
//!
//! This module contains shared utilities used across the focus stacking pipeline.

pub mod error;

pub use error::{StackError, Result};
