use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, GuildId, UserId};
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::ChannelRequirement;
use crate::error::{BotError, Result};

/// A user's standing in one required channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Member,
    Left,
    /// Discord answers 404 for kicked and departed users alike, so only
    /// stub sources report this
    #[cfg(test)]
    Kicked,
}

impl MemberStatus {
    /// Left and kicked users are both denied
    pub fn grants_access(self) -> bool {
        self == MemberStatus::Member
    }
}

/// Source of membership information for required channels
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn member_status(
        &self,
        channel: &ChannelRequirement,
        user_id: UserId,
    ) -> Result<MemberStatus>;
}

/// True only if the user is a member of every channel.
///
/// A failed query counts as not a member.
pub async fn check_membership(
    source: &dyn MembershipSource,
    channels: &[ChannelRequirement],
    user_id: UserId,
) -> bool {
    for channel in channels {
        match source.member_status(channel, user_id).await {
            Ok(status) if status.grants_access() => {}
            Ok(status) => {
                debug!(
                    "User {} is {:?} in required channel '{}'",
                    user_id, status, channel.name
                );
                return false;
            }
            Err(e) => {
                error!("Error checking channel '{}': {}", channel.name, e);
                return false;
            }
        }
    }
    true
}

/// Looks up guild member records over the Discord HTTP API
pub struct GuildMembershipSource {
    http: Arc<serenity::Http>,
}

impl GuildMembershipSource {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MembershipSource for GuildMembershipSource {
    async fn member_status(
        &self,
        channel: &ChannelRequirement,
        user_id: UserId,
    ) -> Result<MemberStatus> {
        let guild_id = GuildId::new(channel.id);

        match guild_id.member(self.http.as_ref(), user_id).await {
            Ok(_) => Ok(MemberStatus::Member),
            Err(serenity::Error::Http(http_err))
                if http_err.status_code().map(|s| s.as_u16()) == Some(404) =>
            {
                Ok(MemberStatus::Left)
            }
            Err(e) => Err(BotError::MembershipQuery {
                channel: channel.name.clone(),
                message: e.to_string(),
            }),
        }
    }
}
