mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use conductor::{ConfigStore, Error as ConductorError};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = run() {
        if let Some(err) = e.downcast_ref::<ConductorError>() {
            eprintln!("Error: {}", err);
            if let Some(suggestion) = err.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let store = ConfigStore::load(&cli.config)?;

    match cli.command {
        Commands::Validate => {
            let mut problems = 0usize;
            for name in store.startup_order() {
                if let Err(e) = store.validate_dependencies(&name) {
                    eprintln!("{}", e);
                    problems += 1;
                }
            }
            if problems > 0 {
                anyhow::bail!("{} service(s) failed dependency validation", problems);
            }
            println!(
                "OK: {} service(s) validated in '{}'",
                store.snapshot().len(),
                cli.config.display()
            );
        }
        Commands::Order => {
            for name in store.startup_order() {
                // Names come straight from the snapshot, lookup cannot miss.
                if let Some(entry) = store.get(&name) {
                    println!(
                        "{:>5}  {}  {}",
                        entry.startup_priority,
                        if entry.enabled { "enabled " } else { "disabled" },
                        name
                    );
                }
            }
        }
    }
    Ok(())
}
