//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete.

/// Autocomplete handlers for SKUs, pending requests, and shopping lists
pub mod autocomplete;
