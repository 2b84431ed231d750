use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use lifemuseum::config::Config;
use lifemuseum::{biographer_for, build_app, build_setup_app, cli, db, AppState};

#[derive(Parser)]
#[command(name = "lifemuseum", about = "A personal museum of dated memories")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server (default)
    Serve,
    /// Create an account
    CreateUser { email: String, password: String },
    /// Import a JSON export into an account
    Import { file: PathBuf, email: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lifemuseum=info,tower_http=info")),
        )
        .init();
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration required: {e}");
            if !matches!(args.command, None | Some(Command::Serve)) {
                return Err(e.into());
            }
            let addr: SocketAddr = std::env::var("BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));
            let listener = TcpListener::bind(addr).await?;
            tracing::warn!("serving setup notice on {}", addr);
            axum::serve(listener, build_setup_app(e.to_string())).await?;
            return Ok(());
        }
    };

    let pool = db::init_pool(&config.database_url).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::CreateUser { email, password } => {
            cli::create_user(&pool, &email, &password).await?;
        }
        Command::Import { file, email } => {
            let imported = cli::import_entries(&pool, &file, &email).await?;
            println!("Imported {} entries", imported);
        }
        Command::Serve => {
            let state = AppState::new(pool, biographer_for(&config));
            let app = build_app(state, config.secure_cookies).await?;
            let listener = TcpListener::bind(config.bind_addr).await?;
            tracing::info!("listening on {}", config.bind_addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
