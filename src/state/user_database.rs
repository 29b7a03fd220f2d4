use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::BotError;

/// Membership verification results, keyed by Discord ID (as string).
///
/// Serialized as a flat JSON object of `user_id -> UserRecord`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserDatabase {
    users: BTreeMap<String, UserRecord>,
}

/// Cached membership check for one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub verified: bool,

    /// Last time membership was checked
    pub last_check: DateTime<Utc>,

    /// First time the user was seen
    pub joined_at: DateTime<Utc>,
}

/// Counters for the stats/about commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStats {
    pub total: usize,
    pub verified: usize,
    pub unverified: usize,
    pub active_24h: usize,
}

impl UserDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file, or create new if not exists
    pub async fn load(path: &str) -> crate::error::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| BotError::StateParse {
                path: path.to_string(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(BotError::StateLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Save to a JSON file atomically
    pub async fn save(&self, path: &str) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        let save_err = |e| BotError::StateSave {
            path: path.to_string(),
            source: e,
        };

        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(save_err)?;
            }
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(save_err)?;
        tokio::fs::rename(&temp_path, path).await.map_err(save_err)?;

        Ok(())
    }

    /// Verified and checked within `interval` of `now`
    pub fn is_verified(&self, user_id: &str, now: DateTime<Utc>, interval: Duration) -> bool {
        match self.users.get(user_id) {
            Some(record) => record.verified && now - record.last_check <= interval,
            None => false,
        }
    }

    /// Record a membership check result.
    ///
    /// `joined_at` is kept from the first record; `last_check` never moves
    /// backwards even if the clock does.
    pub fn set_verified(&mut self, user_id: &str, verified: bool, now: DateTime<Utc>) {
        let record = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord {
                verified,
                last_check: now,
                joined_at: now,
            });

        record.verified = verified;
        record.last_check = record.last_check.max(now);
    }

    #[cfg(test)]
    pub fn get(&self, user_id: &str) -> Option<&UserRecord> {
        self.users.get(user_id)
    }

    /// Returns true if the user existed
    pub fn remove_user(&mut self, user_id: &str) -> bool {
        self.users.remove(user_id).is_some()
    }

    /// IDs of every user whose stored flag is verified
    pub fn verified_user_ids(&self) -> Vec<String> {
        self.users
            .iter()
            .filter(|(_, record)| record.verified)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn stats(&self, now: DateTime<Utc>) -> UserStats {
        let total = self.users.len();
        let verified = self.users.values().filter(|r| r.verified).count();
        let active_24h = self
            .users
            .values()
            .filter(|r| now - r.last_check < Duration::hours(24))
            .count();

        UserStats {
            total,
            verified,
            unverified: total - verified,
            active_24h,
        }
    }
}

/// Shared user database type
pub type SharedUserDatabase = Arc<tokio::sync::RwLock<UserDatabase>>;

pub fn create_shared_user_database(db: UserDatabase) -> SharedUserDatabase {
    Arc::new(tokio::sync::RwLock::new(db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_unknown_user_is_not_verified() {
        let db = UserDatabase::new();
        assert!(!db.is_verified("123", at(0), Duration::seconds(300)));
    }

    #[test]
    fn test_verified_within_interval() {
        let mut db = UserDatabase::new();
        db.set_verified("123", true, at(0));

        assert!(db.is_verified("123", at(0), Duration::seconds(300)));
        assert!(db.is_verified("123", at(300), Duration::seconds(300)));
    }

    #[test]
    fn test_stale_record_is_not_verified() {
        let mut db = UserDatabase::new();
        db.set_verified("123", true, at(0));

        assert!(!db.is_verified("123", at(301), Duration::seconds(300)));
        assert_eq!(db.get("123").map(|r| r.verified), Some(true));
    }

    #[test]
    fn test_false_flag_is_not_verified() {
        let mut db = UserDatabase::new();
        db.set_verified("123", false, at(0));
        assert!(!db.is_verified("123", at(1), Duration::seconds(300)));
    }

    #[test]
    fn test_set_verified_preserves_joined_at() {
        let mut db = UserDatabase::new();
        db.set_verified("123", false, at(0));
        db.set_verified("123", true, at(100));
        db.set_verified("123", false, at(200));

        let record = db.get("123").unwrap();
        assert_eq!(record.joined_at, at(0));
        assert_eq!(record.last_check, at(200));
        assert!(!record.verified);
    }

    #[test]
    fn test_last_check_never_moves_backwards() {
        let mut db = UserDatabase::new();
        db.set_verified("123", true, at(100));
        db.set_verified("123", true, at(50));

        assert_eq!(db.get("123").unwrap().last_check, at(100));
    }

    #[test]
    fn test_stats_and_removal() {
        let mut db = UserDatabase::new();
        db.set_verified("1", true, at(0));
        db.set_verified("2", false, at(0));
        db.set_verified("3", true, at(-2 * 86_400));

        let stats = db.stats(at(10));
        assert_eq!(
            stats,
            UserStats {
                total: 3,
                verified: 2,
                unverified: 1,
                active_24h: 2,
            }
        );

        let mut targets = db.verified_user_ids();
        targets.sort();
        assert_eq!(targets, vec!["1".to_string(), "3".to_string()]);

        assert!(db.remove_user("2"));
        assert!(!db.remove_user("2"));
        assert_eq!(db.user_count(), 2);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("users.json");
        let path = path.to_str().unwrap();

        let mut db = UserDatabase::new();
        db.set_verified("123", true, at(0));
        db.save(path).await.unwrap();

        let loaded = UserDatabase::load(path).await.unwrap();
        assert_eq!(loaded.get("123"), db.get("123"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(raw["123"]["verified"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let db = UserDatabase::load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(db.user_count(), 0);
    }

    #[tokio::test]
    async fn test_load_corrupt_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = UserDatabase::load(path.to_str().unwrap()).await;
        assert!(matches!(result, Err(BotError::StateParse { .. })));
    }
}
