//! Configuration module
//!
//! Settings for the API endpoint, the default search filters and the
//! results display.

pub mod config;
