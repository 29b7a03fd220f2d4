use poise::serenity_prelude as serenity;
use tracing::debug;

use crate::managers::Step;
use crate::{Data, Error};

/// Handle incoming messages
pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    // Ignore bot messages
    if msg.author.bot {
        return Ok(());
    }

    // Lookups are only taken in DMs
    if msg.guild_id.is_some() {
        return Ok(());
    }

    // Prefix commands are handled by poise
    if msg.content.starts_with(&data.config.command_prefix) {
        return Ok(());
    }

    debug!("Processing DM from: {}", msg.author.name);

    match data.dispatcher.handle_text(msg.author.id, &msg.content).await {
        Step::Reply(reply) => {
            msg.channel_id
                .send_message(&ctx.http, reply.to_create_message())
                .await?;
        }
        Step::Deferred { pending, task } => {
            let mut wait_msg = msg
                .channel_id
                .send_message(&ctx.http, pending.to_create_message())
                .await?;

            let result = data.dispatcher.complete(msg.author.id, task).await;
            wait_msg.edit(ctx, result.to_edit_message()).await?;
        }
    }

    Ok(())
}
