//! Robots.txt handling module
//!
//! This module fetches, parses, and caches robots.txt files per origin.
//!
//! # Components
//!
//! - `ParsedRobots`: Allow/Disallow evaluation and `Crawl-delay` lookup
//! - `RobotsEntry` / `RobotsCacheStore`: cached rulesets and their SQLite mirror
//! - `RobotsPolicy`: the async, shared front door used by the fetcher

mod cache;
mod parser;
mod policy;

pub use cache::{RobotsCacheStore, RobotsEntry, RobotsStatus};
pub use parser::{ParsedRobots, MAX_CRAWL_DELAY_SECS};
pub use policy::RobotsPolicy;
