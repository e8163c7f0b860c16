//! Command execution

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::info;

use api_gateway::RestApi;
use common::models::{PredictRequest, TrainRequest};
use registry_config::Settings;
use registry_core::RegistryEngine;

use crate::cli::Command;
use crate::formatters::write_json;

/// Runs `command`; returns whether it succeeded
///
/// Offline commands print their JSON response on stdout. A response with
/// `ok: false` counts as a failure so scripts can branch on the exit code.
pub async fn execute(command: Command, engine: Arc<RegistryEngine>, settings: &Settings) -> Result<bool> {
    match command {
        Command::Serve { host, port } => {
            let mut server = settings.server.clone();
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }

            let api = RestApi::new(engine, &server)?;
            info!("Starting REST API on {}", api.addr());
            api.serve().await?;
            Ok(true)
        }
        other => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            run_offline(other, &engine, &mut out)
        }
    }
}

/// Runs a command that does not need the HTTP server
pub fn run_offline<W: Write>(command: Command, engine: &RegistryEngine, out: &mut W) -> Result<bool> {
    match command {
        Command::Train { request } => {
            let request: TrainRequest = read_request(&request)?;
            let response = engine.train(request)?;
            write_json(out, &response)?;
            Ok(response.ok)
        }
        Command::Predict { request } => {
            let request: PredictRequest = read_request(&request)?;
            let response = engine.predict(&request)?;
            write_json(out, &response)?;
            Ok(response.ok)
        }
        Command::List {
            model_key,
            schema_hash,
        } => {
            let listed = engine.list(model_key.as_deref(), schema_hash.as_deref())?;
            write_json(out, &listed)?;
            Ok(true)
        }
        Command::Health => {
            write_json(out, &engine.health())?;
            Ok(true)
        }
        Command::Serve { .. } => anyhow::bail!("serve needs the async runtime; use execute"),
    }
}

fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading request from stdin")?;
        text
    } else {
        fs::read_to_string(path).with_context(|| format!("reading request file {}", path.display()))?
    };

    serde_json::from_str(&text).with_context(|| format!("decoding request {}", path.display()))
}
