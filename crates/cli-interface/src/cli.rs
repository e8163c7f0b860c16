//! Argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Local model registry: train, version and score gradient-boosted models
#[derive(Parser, Debug)]
#[command(name = "model-registry", version, about, long_about = None)]
pub struct Cli {
    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "MODEL_REGISTRY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The requested command; `serve` when none is given
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            host: None,
            port: None,
        })
    }
}

/// Registry commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API until Ctrl-C
    Serve {
        /// Bind host, overriding the settings
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overriding the settings
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Train a model from a JSON request file ("-" reads stdin)
    Train {
        /// Request body as sent to POST /train
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Score one row from a JSON request file ("-" reads stdin)
    Predict {
        /// Request body as sent to POST /predict
        #[arg(short, long)]
        request: PathBuf,
    },

    /// List stored artifacts, newest first
    List {
        /// Only artifacts of this model key
        #[arg(short, long)]
        model_key: Option<String>,

        /// Only artifacts with this schema fingerprint
        #[arg(short, long)]
        schema_hash: Option<String>,
    },

    /// Print the health report
    Health,
}
