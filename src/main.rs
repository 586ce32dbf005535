use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod crypto;
mod directory;
mod keys;
mod pipeline;
mod ui;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else if args.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let cli::Command::Completions { shell } = args.command {
        let mut cmd = <cli::Cli as clap::CommandFactory>::command();
        clap_complete::generate(shell, &mut cmd, "agelab", &mut std::io::stdout());
        return Ok(());
    }

    let app = cli::App::new(&args)?;
    match args.command {
        cli::Command::Users(args) => cli::users::run(args, &app).await,
        cli::Command::Encrypt(args) => cli::encrypt::run(args, &app).await,
        cli::Command::Decrypt(args) => cli::decrypt::run(args, &app),
        cli::Command::Completions { .. } => Ok(()),
    }
}
