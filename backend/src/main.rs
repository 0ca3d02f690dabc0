//! Main entry point for the market analytics backend.
//!
//! Parses the command line, sets up logging and configuration, then runs the
//! server or one of the administrative commands.

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use market_analytics::auth::AuthService;
use market_analytics::cli::{self, Cli, Command};
use market_analytics::services::seeder;
use market_analytics::{database, init_logging, start_server, AppError, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Serve => start_server(config).await?,
        Command::Seed(command) => {
            let store = database::open_store(&config.database)?;
            if command.destroy {
                seeder::destroy(store.as_ref()).await?;
            } else {
                let auth = auth_service(&config)?;
                let mut rng = StdRng::from_entropy();
                let summary =
                    seeder::seed(store.as_ref(), &auth, chrono::Utc::now(), &mut rng).await?;
                info!(?summary, "seeding finished");
            }
        }
        Command::CreateAdmin(command) => {
            let store = database::open_store(&config.database)?;
            let auth = auth_service(&config)?;
            let user = cli::create_admin(store.as_ref(), &auth, command).await?;
            println!(
                "Created admin user {} <{}> for {}",
                user.name, user.email, user.company
            );
        }
        Command::SetRole(command) => {
            let store = database::open_store(&config.database)?;
            let user = cli::set_role(store.as_ref(), command).await?;
            println!("Updated {} ({}) to role: {}", user.name, user.email, user.role);
        }
    }

    Ok(())
}

fn auth_service(config: &Config) -> Result<AuthService, AppError> {
    AuthService::new(&config.auth).map_err(|e| AppError::config(e.to_string()))
}
