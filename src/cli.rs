use clap::{Parser, Subcommand};

use crate::config::Overrides;

#[derive(Parser)]
#[command(author, version, about = "Chat with the WorkLoad task agent", long_about = None)]
pub struct Cli {
    /// Agent endpoint URL (overrides WORKLOAD_AGENT_URL)
    #[arg(long, global = true)]
    pub agent_url: Option<String>,

    /// Agent identifier (overrides WORKLOAD_AGENT_ID)
    #[arg(long, global = true)]
    pub agent_id: Option<String>,

    /// Optional command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            agent_url: self.agent_url.clone(),
            agent_id: self.agent_id.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a one-off message and print the agent's reply
    Ask {
        /// The message to send
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Show the resolved configuration
    Config,
}
