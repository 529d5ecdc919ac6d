use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::Colorize;

use sace_queue::cli::args::{Cli, Commands};
use sace_queue::cli::commands::{self, QueueContext};
use sace_queue::config::{Config, Paths};
use sace_queue::logging;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        output: format,
        home,
        verbose,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), "sace-queue", &mut std::io::stdout());
        return Ok(());
    }

    let paths = match home {
        Some(root) => Paths::with_root(root),
        None => Paths::new()?,
    };
    let config = Config::load_from_path(&paths.config_file)?;
    logging::init(&config.logging, verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let output = runtime.block_on(async move {
        let ctx = QueueContext::open(&paths, config)?;
        match command {
            Commands::Status { probe } => commands::status(&ctx, probe, format).await,
            Commands::List => commands::list(&ctx, format).await,
            Commands::Show { id } => commands::show(&ctx, &id, format).await,
            Commands::Add { file, update } => commands::add(&ctx, &file, update, format).await,
            Commands::Watch { changes } => {
                commands::watch(&ctx, changes, format, &mut std::io::stdout()).await?;
                Ok(String::new())
            },
            Commands::Clear { force } => commands::clear(&ctx, force, format).await,
            Commands::Completions { .. } => Ok(String::new()),
        }
    })?;

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
