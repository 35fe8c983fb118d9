//! Robots.txt cache entries and their on-disk mirror
//!
//! Entries live in memory for the life of a [`RobotsPolicy`](super::RobotsPolicy)
//! and are mirrored into a small SQLite file so later processes can reuse
//! them without refetching.

use crate::robots::ParsedRobots;
use crate::storage::{StorageError, StorageResult};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// How a cached ruleset came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotsStatus {
    /// robots.txt was served and parsed
    Fetched,
    /// The server answered 4xx; everything is allowed
    Missing,
    /// Network error or 5xx; cached as allow-all so it is not refetched
    Failed,
}

impl RobotsStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Missing => "missing",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "fetched" => Some(Self::Fetched),
            "missing" => Some(Self::Missing),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Cached robots.txt data for one origin
#[derive(Debug, Clone)]
pub struct RobotsEntry {
    pub robots: ParsedRobots,
    pub status: RobotsStatus,
    pub fetched_at: DateTime<Utc>,
}

impl RobotsEntry {
    pub fn fetched(content: &str) -> Self {
        Self {
            robots: ParsedRobots::from_content(content),
            status: RobotsStatus::Fetched,
            fetched_at: Utc::now(),
        }
    }

    pub fn missing() -> Self {
        Self {
            robots: ParsedRobots::allow_all(),
            status: RobotsStatus::Missing,
            fetched_at: Utc::now(),
        }
    }

    pub fn failed() -> Self {
        Self {
            robots: ParsedRobots::allow_all(),
            status: RobotsStatus::Failed,
            fetched_at: Utc::now(),
        }
    }

    /// Whether the entry has outlived `ttl`; without a TTL entries never expire
    pub fn is_stale(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.age() > ttl,
            None => false,
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.robots.is_allowed(url, user_agent)
    }

    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.robots.crawl_delay(user_agent)
    }
}

const ROBOTS_SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS robots_cache (
    origin TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    status TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);
";

/// SQLite file holding one row per origin
pub struct RobotsCacheStore {
    conn: Connection,
}

impl RobotsCacheStore {
    /// Opens (or creates) the cache file, creating parent directories
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        conn.execute_batch(ROBOTS_SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(ROBOTS_SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    pub fn load(&self, origin: &str) -> StorageResult<Option<RobotsEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT content, status, fetched_at FROM robots_cache WHERE origin = ?1",
                params![origin],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((content, status, fetched_at)) = row else {
            return Ok(None);
        };

        let status = RobotsStatus::from_db_string(&status)
            .ok_or_else(|| StorageError::Serialization(format!("Unknown robots status '{}'", status)))?;
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?
            .with_timezone(&Utc);
        let robots = match status {
            RobotsStatus::Fetched => ParsedRobots::from_content(&content),
            RobotsStatus::Missing | RobotsStatus::Failed => ParsedRobots::allow_all(),
        };

        Ok(Some(RobotsEntry {
            robots,
            status,
            fetched_at,
        }))
    }

    pub fn save(&self, origin: &str, entry: &RobotsEntry) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO robots_cache (origin, content, status, fetched_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(origin) DO UPDATE SET
                content = excluded.content,
                status = excluded.status,
                fetched_at = excluded.fetched_at",
            params![
                origin,
                entry.robots.content(),
                entry.status.to_db_string(),
                entry.fetched_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_never_stale_without_ttl() {
        let mut entry = RobotsEntry::fetched("User-agent: *\nDisallow: /admin");
        entry.fetched_at = Utc::now() - Duration::days(365);
        assert!(!entry.is_stale(None));
    }

    #[test]
    fn test_stale_with_ttl() {
        let mut entry = RobotsEntry::missing();
        entry.fetched_at = Utc::now() - Duration::hours(25);
        assert!(entry.is_stale(Some(Duration::hours(24))));
        assert!(!entry.is_stale(Some(Duration::hours(48))));
    }

    #[test]
    fn test_age() {
        let mut entry = RobotsEntry::failed();
        entry.fetched_at = Utc::now() - Duration::hours(12);
        let age = entry.age();
        assert!(age.num_hours() >= 11 && age.num_hours() <= 13);
    }

    #[test]
    fn test_sentinels_allow_everything() {
        assert!(RobotsEntry::missing().is_allowed("/admin", "TestBot"));
        assert!(RobotsEntry::failed().is_allowed("/admin", "TestBot"));
        assert_eq!(RobotsEntry::failed().crawl_delay("TestBot"), None);
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [RobotsStatus::Fetched, RobotsStatus::Missing, RobotsStatus::Failed] {
            assert_eq!(RobotsStatus::from_db_string(status.to_db_string()), Some(status));
        }
        assert_eq!(RobotsStatus::from_db_string("bogus"), None);
    }

    #[test]
    fn test_store_roundtrip() {
        let store = RobotsCacheStore::open_in_memory().unwrap();
        assert!(store.load("https://example.com").unwrap().is_none());

        let entry = RobotsEntry::fetched("User-agent: *\nDisallow: /admin\nCrawl-delay: 3");
        store.save("https://example.com", &entry).unwrap();

        let loaded = store.load("https://example.com").unwrap().unwrap();
        assert_eq!(loaded.status, RobotsStatus::Fetched);
        assert!(!loaded.is_allowed("/admin", "TestBot"));
        assert_eq!(loaded.crawl_delay("TestBot"), Some(3.0));

        store.save("https://example.com", &RobotsEntry::failed()).unwrap();
        let loaded = store.load("https://example.com").unwrap().unwrap();
        assert_eq!(loaded.status, RobotsStatus::Failed);
        assert!(loaded.is_allowed("/admin", "TestBot"));
    }

    #[test]
    fn test_store_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("robots.sqlite");
        {
            let store = RobotsCacheStore::open(&path).unwrap();
            store.save("https://a.test", &RobotsEntry::missing()).unwrap();
        }
        let store = RobotsCacheStore::open(&path).unwrap();
        assert_eq!(store.load("https://a.test").unwrap().unwrap().status, RobotsStatus::Missing);
    }
}
