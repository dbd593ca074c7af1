// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Herald - presence-aware notification delivery.
//!
//! This is the binary entry point for the Herald server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod token;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use herald_config::HeraldConfig;

/// Herald - presence-aware notification delivery.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the default search path.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP/WebSocket server.
    Serve,
    /// Load and validate the configuration, then exit.
    CheckConfig,
    /// Print a signed access token for local testing.
    Token {
        /// User id placed in the `sub` claim.
        #[arg(long)]
        sub: String,
        /// Optional email claim.
        #[arg(long)]
        email: Option<String>,
        /// Days until the token expires.
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
}

fn load_config(path: Option<&PathBuf>) -> HeraldConfig {
    let loaded = match path {
        Some(path) => herald_config::load_and_validate_path(path),
        None => herald_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            herald_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("herald serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => {
            println!(
                "herald: configuration is valid (server={}:{}, storage.backend={:?}, auth={})",
                config.server.host,
                config.server.port,
                config.storage.backend,
                if config.auth.jwt_secret.is_some() {
                    "configured"
                } else {
                    "missing secret"
                }
            );
        }
        Some(Commands::Token { sub, email, days }) => {
            match token::issue_token(&config, &sub, email, days) {
                Ok(token) => println!("{token}"),
                Err(e) => {
                    eprintln!("herald token: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("herald: use --help for available commands");
        }
    }
}
