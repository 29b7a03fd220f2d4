//! Owner-only commands.
//!
//! These skip the membership gate; anyone other than the configured owner
//! gets a fixed denial.

use chrono::Utc;
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::messages;
use crate::{Context, Error};

/// Replies with the denial and returns false for non-owners
async fn ensure_owner(ctx: Context<'_>) -> Result<bool, Error> {
    if ctx.data().dispatcher.is_owner(ctx.author().id) {
        return Ok(true);
    }
    ctx.say(messages::access_denied_message()).await?;
    Ok(false)
}

/// Bot statistics (owner only)
#[poise::command(prefix_command, slash_command)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_owner(ctx).await? {
        return Ok(());
    }

    let stats = ctx.data().verification_manager.stats().await;
    ctx.say(messages::stats_message(&ctx.data().config, &stats, Utc::now()))
        .await?;
    Ok(())
}

/// Send a message to every verified user (owner only)
#[poise::command(prefix_command, slash_command)]
pub async fn broadcast(
    ctx: Context<'_>,
    #[description = "Message to send"]
    #[rest]
    message: Option<String>,
) -> Result<(), Error> {
    if !ensure_owner(ctx).await? {
        return Ok(());
    }

    let config = &ctx.data().config;
    let message = match message.as_deref().map(str::trim) {
        Some(message) if !message.is_empty() => message.to_string(),
        _ => {
            ctx.say(messages::broadcast_usage_message(&config.command_prefix))
                .await?;
            return Ok(());
        }
    };

    let verification_manager = &ctx.data().verification_manager;
    let targets = verification_manager.verified_user_ids().await;
    let total_users = verification_manager.user_count().await;

    let confirm = ctx
        .say(messages::broadcast_started_message(targets.len(), &message))
        .await?;

    info!(
        "Broadcast by {} to {} verified users",
        ctx.author().name,
        targets.len()
    );

    let text = messages::broadcast_message(&message, &config.owner_username);
    let mut sent = 0;
    let mut failed = 0;

    for user_id in targets {
        match send_dm(ctx, user_id, &text).await {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                error!("Failed to send to {}: {}", user_id, e);
            }
        }

        // Small delay to avoid hitting rate limits
        tokio::time::sleep(config.broadcast_delay()).await;
    }

    info!("Broadcast finished: {} sent, {} failed", sent, failed);

    confirm
        .edit(
            ctx,
            poise::CreateReply::default().content(messages::broadcast_complete_message(
                sent,
                failed,
                total_users,
            )),
        )
        .await?;
    Ok(())
}

async fn send_dm(ctx: Context<'_>, user_id: serenity::UserId, text: &str) -> Result<(), Error> {
    let dm_channel = user_id.create_dm_channel(ctx.http()).await?;
    dm_channel
        .send_message(ctx.http(), serenity::CreateMessage::new().content(text))
        .await?;
    Ok(())
}

/// Delete a user's verification record (owner only)
#[poise::command(prefix_command, slash_command, rename = "removeuser")]
pub async fn remove_user(
    ctx: Context<'_>,
    #[description = "User to remove"] user: serenity::User,
) -> Result<(), Error> {
    if !ensure_owner(ctx).await? {
        return Ok(());
    }

    let removed = ctx.data().verification_manager.remove_user(user.id).await;
    if !removed {
        warn!("removeuser: {} was not in the database", user.id);
    }
    ctx.say(messages::user_removed_message(&user.name, removed))
        .await?;
    Ok(())
}
