use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use hydrobot::bot::reminders::ReminderSelector;
use hydrobot::bot::telegram::to_inbound;
use hydrobot::bot::{
    BroadcastSettings, Dispatcher as CommandDispatcher, OcrClient, Scheduler, Services, TelegramClient,
    TtsClient, WeatherClient,
};
use hydrobot::config::Config;
use hydrobot::{liveness, telegram_log};

/// Language of the synthesized speech.
const TTS_LANG: &str = "vi";

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.bot_token);
    let telegram = TelegramClient::new(bot.clone());

    // Setup logging
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let (non_blocking, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "hydrobot.log"));

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let chat_layer = telegram_log::ChatLogLayer::new(Arc::new(telegram.clone()), log_chat_id);
        registry.with(chat_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting hydrobot...");
    info!("Broadcast chat: {}", config.broadcast_chat_id);
    if config.rapid_api_key.is_some() {
        info!("RAPID_API_KEY is set but no adapter uses it");
    }

    let scratch_dir = config.scratch_dir();
    if let Err(e) = std::fs::create_dir_all(&scratch_dir) {
        error!("Failed to create scratch dir {}: {e}", scratch_dir.display());
    }

    let telegram = Arc::new(telegram);
    let services = Services {
        weather: Arc::new(WeatherClient::new(config.weather_api_key.clone())),
        ocr: Arc::new(OcrClient::new(config.ocr_api_key.clone())),
        tts: Arc::new(TtsClient::new(TTS_LANG.to_string())),
        chat: telegram.clone(),
        files: telegram.clone(),
        link_handler: None,
    };
    let dispatcher = Arc::new(CommandDispatcher::new(services, scratch_dir));

    let port = config.port;
    tokio::spawn(async move {
        if let Err(e) = liveness::serve(port).await {
            error!("Liveness endpoint stopped: {e}");
        }
    });

    let scheduler = Scheduler::new(
        ReminderSelector::default(),
        telegram.clone(),
        BroadcastSettings::from_config(&config),
    );
    tokio::spawn(scheduler.run());

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(msg: Message, dispatcher: Arc<CommandDispatcher>) -> ResponseResult<()> {
    let inbound = to_inbound(&msg);
    dispatcher.handle(&inbound).await;
    Ok(())
}
