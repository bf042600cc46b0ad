use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use log::error;
use orbitia_core::{logger, AiClient, Config, ConfigError, InboundMessage, OutboundMessage, Relay, Settings};
use tokio::sync::mpsc;

mod app;
mod commands;
mod handler;
mod panel;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, TICK_RATE};

#[derive(Parser)]
#[command(name = "orbitia")]
#[command(version, about = "Chat with a generative-language model from your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend to use: "gemini" or "http"
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Gemini model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Endpoint for the http provider
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Request deadline in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the greeting
    Hello,
    /// Ask one question and print the answer
    Ask {
        /// Your question
        text: String,
    },
}

impl Cli {
    /// Config file plus command-line overrides.
    fn config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::load()?;
        if let Some(provider) = &self.provider {
            config.provider = Some(provider.clone());
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }
        Ok(config)
    }

    fn settings(&self) -> Result<Settings, ConfigError> {
        self.config()?.validate()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Hello) => {
            println!("{}", commands::GREETING);
            Ok(())
        }
        Some(Commands::Ask { text }) => {
            logger::setup_stderr_logger(logger::level_from_env())?;
            ask_once(cli.settings()?, text).await
        }
        None => {
            logger::setup_file_logger(&logger::default_log_path()?, logger::level_from_env())?;
            run_shell(cli.settings()).await
        }
    }
}

/// One relay round trip, printed to stdout.
async fn ask_once(settings: Settings, text: &str) -> Result<()> {
    let client = AiClient::from_settings(&settings)?;
    let (panel, mut replies) = mpsc::unbounded_channel();
    let relay = Relay::new(client, Arc::new(panel));

    let Some(request) = relay.handle_inbound(OutboundMessage::ask(text, None).to_value()) else {
        bail!("nothing to ask: the question is blank");
    };
    request.await?;

    let reply = replies
        .recv()
        .await
        .and_then(|envelope| InboundMessage::from_value(&envelope))
        .ok_or_else(|| anyhow!("the relay closed without answering"))?;
    println!("{}", reply.text());
    Ok(())
}

async fn run_shell(settings: Result<Settings, ConfigError>) -> Result<()> {
    if let Err(e) = &settings {
        error!("Configuration invalid, chat will not be available: {}", e);
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(settings);
    let mut events = EventHandler::new(TICK_RATE);

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    app.close_chat();
    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
