use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::num::NonZeroU64;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot that gates player profile lookups behind server membership
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the bot configuration (overrides CONFIG_PATH)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Force re-sync of slash commands to all guilds (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<NonZeroU64>,

    /// Log at debug level
    #[arg(long, short = 'v')]
    verbose: bool,
}

mod commands;
mod config;
mod error;
mod events;
mod logging;
mod managers;
mod messages;
mod reply;
mod state;

use commands::{about, broadcast, help, remove_user, start, stats};
use config::BotConfig;
use events::{handle_interaction, handle_message};
use managers::{
    create_shared_verification_manager, Dispatcher, GuildMembershipSource, ProfileLookup,
    SharedDispatcher, SharedVerificationManager, UpstreamClient,
};
use state::{create_shared_user_database, UserDatabase};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub verification_manager: SharedVerificationManager,
    pub dispatcher: SharedDispatcher,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = handle_message(ctx, new_message, data).await {
                error!("Failed to handle message: {}", e);
            }
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let Err(e) = handle_interaction(ctx, interaction, data).await {
                error!("Failed to handle interaction: {}", e);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Log the application ID encoded in the first token segment
fn log_bot_id(token: &str) {
    use base64::Engine;

    let Some(bot_id_b64) = token.split('.').next() else {
        return;
    };

    // Discord tokens use URL-safe base64 without padding
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(bot_id_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));

    if let Some(id_str) = decoded.ok().and_then(|d| String::from_utf8(d).ok()) {
        info!(
            "Bot ID: {} (configure the bot at https://discord.com/developers/applications/{}/bot)",
            id_str, id_str
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    logging::init(args.verbose);

    let token = std::env::var("DISCORD_TOKEN")
        .map_err(|_| anyhow::anyhow!("Missing DISCORD_TOKEN environment variable"))?;
    log_bot_id(&token);

    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("CONFIG_PATH").ok())
        .unwrap_or_else(|| "data/bot.json".to_string());

    info!("Loading configuration from {}...", config_path);
    let config = Arc::new(BotConfig::load_from_file(&config_path)?);
    info!(
        "Owner ID: {}, required servers: {}, API: {}",
        config.owner_id,
        config.required_channels.len(),
        config.api.url()
    );

    info!("Loading user database...");
    let user_database = UserDatabase::load(&config.database_file)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not load user database: {}, using empty database", e);
            UserDatabase::new()
        });
    info!("Loaded {} users", user_database.user_count());
    let shared_user_database = create_shared_user_database(user_database);

    let upstream: Arc<dyn ProfileLookup> = Arc::new(UpstreamClient::new(config.api.clone())?);

    // Extract CLI flags for use in setup
    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id;

    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }

    let prefix = config.command_prefix.clone();
    let setup_config = config.clone();

    // Build framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![start(), help(), about(), stats(), broadcast(), remove_user()],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say(format!("An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
                            error!("Argument parse error in '{}': {} (input: {:?})", ctx.command().qualified_name, error, input);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config = setup_config.clone();
            let shared_user_database = shared_user_database.clone();
            let upstream = upstream.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let membership = Arc::new(GuildMembershipSource::new(ctx.http.clone()));
                let verification_manager = create_shared_verification_manager(
                    shared_user_database,
                    &config.database_file,
                    membership,
                    config.required_channels.clone(),
                    config.check_interval(),
                );
                let dispatcher = Arc::new(Dispatcher::new(
                    config.clone(),
                    verification_manager.clone(),
                    upstream,
                ));

                // Determine which guilds to register commands for
                let guilds_to_register: Vec<serenity::GuildId> = if let Some(gid) = target_guild_id {
                    vec![serenity::GuildId::new(gid.get())]
                } else {
                    ready.guilds.iter().map(|g| g.id).collect()
                };

                if guild_commands || sync_commands {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        ).await {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        } else {
                            info!("Successfully registered {} commands for guild {}",
                                  framework.options().commands.len(), guild_id);
                        }
                    }
                } else {
                    info!("Registering commands globally...");
                    if let Err(e) = poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    ).await {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                              framework.options().commands.len());
                    }
                }

                Ok(Data {
                    config,
                    verification_manager,
                    dispatcher,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable the MESSAGE_CONTENT privileged intent at https://discord.com/developers/applications -> Your App -> Bot -> Privileged Gateway Intents");
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents. Enable MESSAGE_CONTENT in the Discord Developer Portal"
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
