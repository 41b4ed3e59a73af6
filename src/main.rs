mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use cv_core::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = Config::load_or_default(cli.config.as_deref());
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            tracing::info!(
                "Starting clipvault on {}:{}",
                config.server.host,
                config.server.port
            );

            cv_server::start(config).await?;
        }

        Commands::CheckTools => {
            let config = Config::load_or_default(cli.config.as_deref());
            let registry = cv_av::ToolRegistry::discover(&config.tools);
            for info in registry.check_all() {
                if info.available {
                    println!(
                        "{:<10} {} ({})",
                        info.name,
                        info.path
                            .as_deref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_default(),
                        info.version.as_deref().unwrap_or("unknown version"),
                    );
                } else {
                    println!("{:<10} NOT FOUND", info.name);
                }
            }
        }

        Commands::Validate { config } => {
            let path = config.or(cli.config);
            let config = Config::load_or_default(path.as_deref());
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid");
            } else {
                for warning in &warnings {
                    println!("warning: {warning}");
                }
                std::process::exit(1);
            }
        }

        Commands::HashPassword { password } => {
            let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)?;
            println!("{hash}");
        }

        Commands::GenerateSecret => {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            let bytes: [u8; 32] = rng.gen();
            println!("{}", hex::encode(bytes));
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose {
        "clipvault=debug,cv_server=debug,cv_db=debug,cv_av=debug,tower_http=debug"
    } else {
        "clipvault=info,cv_server=info,cv_db=info,cv_av=info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
