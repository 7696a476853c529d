use clap::Parser;
use lockbox::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr so `get` output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LOCKBOX_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Secure memory needs the runtime before any password is read.
    if let Err(e) = lockbox::crypto::init() {
        lockbox::cli::output::error(&e.to_string());
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Init => lockbox::cli::commands::init::execute(&cli),
        Commands::Add {
            ref service,
            ref username,
        } => lockbox::cli::commands::add::execute(&cli, service, username),
        Commands::List => lockbox::cli::commands::list::execute(&cli),
        Commands::Get { ref service } => lockbox::cli::commands::get::execute(&cli, service),
    };

    if let Err(e) = result {
        lockbox::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
