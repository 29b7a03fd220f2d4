use chrono::Utc;
use poise::serenity_prelude::UserId;
use std::sync::Arc;
use tracing::{error, info};

use super::membership::{check_membership, MembershipSource};
use crate::config::ChannelRequirement;
use crate::state::{SharedUserDatabase, UserDatabase, UserStats};

/// Gates lookups behind membership of the required channels.
///
/// Owns the user database and writes it back to disk after every change.
/// Writes hold the database write lock across the save, so concurrent
/// updates for different users never interleave on disk.
pub struct VerificationManager {
    /// User database
    user_db: SharedUserDatabase,

    /// Where the database is persisted
    db_path: String,

    membership: Arc<dyn MembershipSource>,

    channels: Vec<ChannelRequirement>,

    /// How long a membership result stays valid
    interval: chrono::Duration,
}

impl VerificationManager {
    pub fn new(
        user_db: SharedUserDatabase,
        db_path: &str,
        membership: Arc<dyn MembershipSource>,
        channels: Vec<ChannelRequirement>,
        interval: chrono::Duration,
    ) -> Self {
        Self {
            user_db,
            db_path: db_path.to_string(),
            membership,
            channels,
            interval,
        }
    }

    /// Cached verification state, without asking Discord
    pub async fn is_verified(&self, user_id: UserId) -> bool {
        let db: tokio::sync::RwLockReadGuard<'_, UserDatabase> = self.user_db.read().await;
        db.is_verified(&user_id.to_string(), Utc::now(), self.interval)
    }

    /// Store a membership result and persist the database
    pub async fn set_verified(&self, user_id: UserId, verified: bool) {
        let mut db: tokio::sync::RwLockWriteGuard<'_, UserDatabase> = self.user_db.write().await;
        db.set_verified(&user_id.to_string(), verified, Utc::now());
        if let Err(e) = db.save(&self.db_path).await {
            error!("Error saving user database: {}", e);
        }
    }

    /// Ask every required channel and store the result
    pub async fn verify(&self, user_id: UserId) -> bool {
        let is_member = check_membership(self.membership.as_ref(), &self.channels, user_id).await;
        self.set_verified(user_id, is_member).await;
        if is_member {
            info!("User {} verified", user_id);
        }
        is_member
    }

    /// Cached result if still fresh, otherwise a new membership check
    pub async fn ensure_verified(&self, user_id: UserId) -> bool {
        if self.is_verified(user_id).await {
            return true;
        }
        self.verify(user_id).await
    }

    /// Remove a user's record. Returns false if the user was unknown.
    pub async fn remove_user(&self, user_id: UserId) -> bool {
        let mut db: tokio::sync::RwLockWriteGuard<'_, UserDatabase> = self.user_db.write().await;
        if !db.remove_user(&user_id.to_string()) {
            return false;
        }
        if let Err(e) = db.save(&self.db_path).await {
            error!("Error saving user database: {}", e);
        }
        info!("Removed user {} from database", user_id);
        true
    }

    pub async fn stats(&self) -> UserStats {
        let db: tokio::sync::RwLockReadGuard<'_, UserDatabase> = self.user_db.read().await;
        db.stats(Utc::now())
    }

    /// Users whose last check succeeded, parsed back into Discord IDs
    pub async fn verified_user_ids(&self) -> Vec<UserId> {
        let db: tokio::sync::RwLockReadGuard<'_, UserDatabase> = self.user_db.read().await;
        db.verified_user_ids()
            .iter()
            .filter_map(|id| id.parse::<u64>().ok())
            .filter(|id| *id != 0)
            .map(UserId::new)
            .collect()
    }

    pub async fn user_count(&self) -> usize {
        let db: tokio::sync::RwLockReadGuard<'_, UserDatabase> = self.user_db.read().await;
        db.user_count()
    }

    #[cfg(test)]
    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

/// Shared verification manager type
pub type SharedVerificationManager = Arc<VerificationManager>;

pub fn create_shared_verification_manager(
    user_db: SharedUserDatabase,
    db_path: &str,
    membership: Arc<dyn MembershipSource>,
    channels: Vec<ChannelRequirement>,
    interval: chrono::Duration,
) -> SharedVerificationManager {
    Arc::new(VerificationManager::new(
        user_db, db_path, membership, channels, interval,
    ))
}
