use poise::serenity_prelude as serenity;
use tracing::debug;

use crate::managers::{Action, Step};
use crate::{Data, Error};

/// Handle button presses on messages the bot sent
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), Error> {
    // Slash commands go through poise
    let Some(component) = interaction.as_message_component() else {
        return Ok(());
    };

    let Some(action) = Action::parse(&component.data.custom_id) else {
        debug!(
            "Ignoring unknown component '{}' from {}",
            component.data.custom_id, component.user.name
        );
        return Ok(());
    };

    debug!("User {} pressed {:?}", component.user.name, action);

    // Must be acknowledged within three seconds, before any slow I/O
    match data.dispatcher.handle_action(action) {
        Step::Reply(reply) => {
            component
                .create_response(
                    &ctx.http,
                    serenity::CreateInteractionResponse::UpdateMessage(
                        reply.to_interaction_message(),
                    ),
                )
                .await?;
        }
        Step::Deferred { pending, task } => {
            component
                .create_response(
                    &ctx.http,
                    serenity::CreateInteractionResponse::UpdateMessage(
                        pending.to_interaction_message(),
                    ),
                )
                .await?;

            let result = data.dispatcher.complete(component.user.id, task).await;
            component
                .edit_response(&ctx.http, result.to_edit_interaction())
                .await?;
        }
    }

    Ok(())
}
