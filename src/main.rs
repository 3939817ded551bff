//! Sludi - library-upgrade failure diagnosis
//!
//! Reruns a client's failing test against an upgraded library, extracts the
//! exception and failing method from the log, and asks an LLM for a fix.

use anyhow::Result;
use sludi::cli::{
    build_client, config, diagnose, discover, extract, find_record, print_context_json,
    print_context_text, test, Cli, Commands, OutputFormat, Session,
};
use sludi::{LocalizeError, Workspace};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli).await {
        if let Some(err) = e.downcast_ref::<LocalizeError>() {
            eprintln!("{}", err.format_for_cli());
            std::process::exit(1);
        }
        return Err(e);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let root = Path::new(&cli.workspace);

    // Config must work even when sludi.toml doesn't parse
    let workspace = match &cli.command {
        Commands::Config(args) => return config(root, args.show, args.init, args.force),
        _ => Workspace::open(root)?,
    };

    // Execute command
    match cli.command {
        Commands::Discover(args) => {
            discover(&workspace, &args.id)?;
        }

        Commands::Test(args) => {
            test(&workspace, &args.id)?;
        }

        Commands::Extract(args) => {
            let ctx = extract(&workspace, &args.id)?;

            match cli.format {
                OutputFormat::Json => print_context_json(&ctx)?,
                OutputFormat::Text => print_context_text(&ctx),
            }
        }

        Commands::Diagnose(args) => {
            diagnose(&workspace, &args.id, args.yes, &args.llm).await?;
        }

        Commands::Session(args) => {
            let record = if args.run_tests {
                discover(&workspace, &args.id)?
            } else {
                find_record(&workspace, &args.id)?
            };

            let client = build_client(&workspace, &args.llm);
            let stdin = std::io::stdin();
            Session::new(&workspace, record, &client, stdin.lock(), std::io::stdout())
                .with_tests(args.run_tests)
                .run()
                .await?;
        }

        Commands::Config(_) => {}
    }

    Ok(())
}
