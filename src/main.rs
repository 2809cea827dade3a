use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use tsbot::access::AccessGuard;
use tsbot::commands::{Command, TEAMSPEAK_UNAVAILABLE, whoami_text};
use tsbot::config::Config;
use tsbot::format::format_user_list;
use tsbot::live::{ALREADY_LIVE_TEXT, LiveBoard, LiveError, StartOutcome, already_live_reply_target};
use tsbot::teamspeak::WebQueryClient;
use tsbot::telegram::TelegramClient;
use tsbot::telegram_log::TelegramLogLayer;

/// Used when RUST_LOG is unset. Keeps per-request HTTP logging quiet.
const DEFAULT_LOG_FILTER: &str = "info,reqwest=warn,hyper=warn,hyper_util=warn";

struct BotState {
    config: Config,
    access: AccessGuard,
    teamspeak: WebQueryClient,
    telegram: TelegramClient,
    live: LiveBoard,
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ts-bot: {e}");
            std::process::exit(2);
        }
    };

    let bot = Bot::new(&config.bot_token);
    let _log_guard = init_logging(&config, &bot);

    info!("🚀 Starting ts-bot...");
    info!("Config: {:?}", config);

    let teamspeak = match WebQueryClient::new(&config.ts_url, &config.ts_api_key, config.ts_server_id) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build TeamSpeak client: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let state = Arc::new(BotState {
        access: AccessGuard::new(config.allowed_groups.clone()),
        teamspeak,
        telegram: TelegramClient::new(bot.clone()),
        live: LiveBoard::new(),
        config,
    });

    spawn_live_refresher(state.clone());

    let handler = dptree::filter(|update: Update, state: Arc<BotState>| state.access.admits_update(&update))
        .branch(Update::filter_message().filter_command::<Command>().endpoint(handle_command));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_logging(config: &Config, bot: &Bot) -> Option<WorkerGuard> {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(env_filter());

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Failed to create log dir {}: {e}", dir.display());
            }
            let (non_blocking, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "ts-bot.log"));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let telegram_layer = config
        .log_chat_id
        .map(|chat_id| TelegramLogLayer::new(bot.clone(), chat_id));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(telegram_layer)
        .init();

    guard
}

fn spawn_live_refresher(state: Arc<BotState>) {
    tokio::spawn(async move {
        let config = &state.config;
        state
            .live
            .run_refresher(&state.teamspeak, &state.telegram, config.live_first_delay, config.live_interval)
            .await;
    });
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    let reply_to = Some(msg.id.0 as i64);
    let telegram = &state.telegram;

    match cmd {
        Command::Help => {
            let help = Command::descriptions().to_string();
            telegram.send_message(chat_id, &help, None, reply_to).await.ok();
        }
        Command::Whoami => {
            let Some(ref user) = msg.from else {
                return Ok(());
            };
            let text = whoami_text(user.id.0, chat_id);
            telegram.send_message(chat_id, &text, Some(ParseMode::Html), reply_to).await.ok();
        }
        Command::Ts => match state.teamspeak.fetch_user_list().await {
            Ok(list) => {
                let text = format_user_list(&list);
                telegram
                    .send_message(chat_id, &text, Some(ParseMode::MarkdownV2), reply_to)
                    .await
                    .ok();
            }
            Err(e) => {
                warn!("TeamSpeak query failed: {e}");
                telegram.send_message(chat_id, TEAMSPEAK_UNAVAILABLE, None, reply_to).await.ok();
            }
        },
        Command::Tslive => match state.live.start(chat_id, &state.teamspeak, telegram).await {
            Ok(StartOutcome::Created(_)) => {}
            Ok(StartOutcome::AlreadyLive(existing)) => {
                let target = already_live_reply_target(&existing, chat_id, msg.id.0 as i64);
                telegram.send_message(chat_id, ALREADY_LIVE_TEXT, None, Some(target)).await.ok();
            }
            Err(LiveError::TeamSpeak(e)) => {
                warn!("Failed to start live message: {e}");
                telegram.send_message(chat_id, TEAMSPEAK_UNAVAILABLE, None, reply_to).await.ok();
            }
            // Already logged by the client
            Err(LiveError::Telegram(_)) => {}
        },
    }

    Ok(())
}
