//! Capira CLI - build, serve and lint the front end.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "capira")]
#[command(about = "Build, serve and lint the Capira front end")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to capira.toml config file
    #[arg(short, long, default_value = "capira.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the production build (default)
    Build {
        /// Output directory, relative to the current directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip minification
        #[arg(long)]
        no_minify: bool,
    },

    /// Remove build output
    Clean,

    /// Start the development server with live reload
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Build, then preview the distribution tree
    ServeDist {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Lint scripts and element definitions
    Lint,

    /// Collect TODO and FIXME comments into TODO.md
    Todo {
        /// Only keep entries whose text or file contains this
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Write the service worker precache manifest
    Precache,

    /// Show the overlay palette
    Palette {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,

        /// Validate the catalog and exit
        #[arg(long)]
        check: bool,

        /// Load a catalog from a YAML or JSON file instead of the built-in one
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = config::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Build {
        output: None,
        no_minify: false,
    }) {
        Commands::Build { output, no_minify } => {
            let minify = if no_minify { Some(false) } else { None };
            commands::build::run(&config, output, minify).await?;
        }
        Commands::Clean => {
            commands::clean::run(&config).await?;
        }
        Commands::Serve { port, no_open } => {
            commands::dev::run(&config, port, !no_open).await?;
        }
        Commands::ServeDist { port, no_open } => {
            commands::serve_dist::run(&config, port, !no_open).await?;
        }
        Commands::Lint => {
            commands::lint::run(&config).await?;
        }
        Commands::Todo { query } => {
            commands::todo::run(&config, query.as_deref())?;
        }
        Commands::Precache => {
            commands::precache::run(&config)?;
        }
        Commands::Palette { json, check, file } => {
            commands::palette::run(file.as_deref(), json, check)?;
        }
    }

    Ok(())
}
