use tracing::info;

use crate::messages;
use crate::reply::Reply;
use crate::{Context, Error};

/// Check access and show how to use the bot
#[poise::command(prefix_command, slash_command)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    let author = ctx.author();
    let reply = ctx.data().dispatcher.start(author.id, &author.name).await;
    ctx.send(reply.to_create_reply()).await?;
    Ok(())
}

/// Show help information
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let text = messages::help_message(&ctx.data().config.owner_username);
    ctx.send(Reply::text(text).to_create_reply()).await?;
    Ok(())
}

/// About this bot
#[poise::command(prefix_command, slash_command)]
pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
    let stats = ctx.data().verification_manager.stats().await;
    info!("About requested by {}", ctx.author().name);
    ctx.say(messages::about_message(&ctx.data().config, &stats))
        .await?;
    Ok(())
}
