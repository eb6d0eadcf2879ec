mod agent;
mod chat;
mod cli;
mod clipboard;
mod config;
mod logging;
mod markdown;
mod tui;

use anyhow::{bail, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;
use tracing::info;

use agent::{AgentClient, HttpAgentClient};
use chat::{ChatSession, MessageRole};
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env(&cli.overrides())?;

    match cli.command {
        Some(Commands::Config) => {
            println!("Agent URL:   {}", config.agent_url);
            println!("Agent ID:    {}", config.agent_id);
            println!("Agent name:  {}", config.agent_name);
            println!("API key:     {}", config.masked_api_key());
            println!("Log file:    {}", config.log_dir.join(logging::LOG_FILE).display());
            println!("Log filter:  {}", config.log_filter);
        }
        Some(Commands::Ask { message }) => {
            logging::init(&config)?;
            let client = http_client(&config);
            ask(&client, &config, &message.join(" ")).await?;
        }
        None => {
            let log_path = logging::init(&config)?;
            info!(log = %log_path.display(), "logging initialised");
            let client: Arc<dyn AgentClient> = Arc::new(http_client(&config));
            tui::run(config, client).await?;
        }
    }

    Ok(())
}

fn http_client(config: &AppConfig) -> HttpAgentClient {
    let client =
        HttpAgentClient::new(config.agent_url.clone()).with_api_key(config.api_key.clone());
    info!(endpoint = %client.endpoint(), agent = %config.agent_id, "agent client ready");
    client
}

/// Send one message outside the TUI and print what came back.
async fn ask(client: &dyn AgentClient, config: &AppConfig, text: &str) -> Result<()> {
    let mut session = ChatSession::new(config.agent_id.clone());
    info!(user = session.user_id(), "one-off ask");
    let Some(pending) = session.begin_send(text) else {
        bail!("Nothing to send");
    };

    let outcome = client.call(&pending.request).await;
    session.complete(&pending, outcome);

    let Some(reply) = session.active().and_then(|c| c.messages.last()) else {
        bail!("No reply recorded");
    };
    match reply.role {
        MessageRole::Error => bail!("{}", reply.content),
        _ => {
            println!("{}", reply.content);
            Ok(())
        }
    }
}
