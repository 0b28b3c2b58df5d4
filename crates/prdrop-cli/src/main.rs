//! PRDROP CLI Application

mod cli;

use clap::Parser as _;
use cli::{Cli, Commands, EmailCommands, InputsCommands, SetupCommands};
use prdrop_sdk::commands::{
    build_inputs, extract_email, print_schema, prove, setup_command, setup_digest, verify_request,
};

fn init_tracing() -> eyre::Result<()> {
    #[cfg(feature = "tokio-console")]
    {
        // tokio-console: layers the console subscriber with fmt
        use tracing_subscriber::prelude::*;
        tracing_subscriber::registry()
            .with(console_subscriber::spawn())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                    ),
            )
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing: {:?}", e))?;
    }

    #[cfg(not(feature = "tokio-console"))]
    {
        // Logs go to stderr; stdout carries JSON output.
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_timer(tracing_subscriber::fmt::time::uptime())
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing: {:?}", e))?;
    }

    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> eyre::Result<()> {
    // Load .env file (fails silently if not found)
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let cli = Cli::parse();

    let res = match cli.command {
        Commands::Email { command } => match command {
            EmailCommands::Extract { email, out } => extract_email(email, out).await,
        },
        Commands::Inputs { command } => {
            let params = command.params();
            match command {
                InputsCommands::Build {
                    email,
                    dkim,
                    wallet,
                    out,
                    ..
                } => build_inputs(email, dkim, wallet, params, out).await,
            }
        }
        Commands::Setup { command } => match command {
            SetupCommands::Digest { circuit, key_out } => setup_digest(circuit, key_out).await,
            SetupCommands::Command {
                circuit,
                vk,
                key_out,
            } => setup_command(circuit, vk, key_out).await,
        },
        Commands::Prove {
            inputs,
            out,
            engine,
        } => prove(engine.into(), inputs, out).await,
        Commands::Verify { request, engine } => verify_request(engine.into(), request).await,
        Commands::Serve { args } => prdrop_server::serve(args.into()).await,
        Commands::Schema { target } => print_schema(target),
    };

    if let Err(e) = res {
        tracing::error!("Error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
