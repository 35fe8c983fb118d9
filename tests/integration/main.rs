//! Integration tests for gleaner
//!
//! Each module drives the public API against wiremock servers and
//! temporary SQLite files.

mod crawl_tests;
mod state_tests;
