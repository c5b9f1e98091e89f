use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docshelf::config::ServerConfig;
use docshelf::server::{AppState, create_router, open_store};
use docshelf::service::Directory;

#[derive(Parser)]
#[command(name = "docshelf")]
#[command(about = "A self-hostable document shelf", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "DOCSHELF_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the database, content and search index
    #[arg(long, global = true, env = "DOCSHELF_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and provision storage
    Init,

    /// User management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Rebuild the search index from stored content
    Reindex,

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, env = "DOCSHELF_HOST")]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short, env = "DOCSHELF_PORT")]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user and print its token
    Add {
        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        name: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir.clone_from(data_dir);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("docshelf=info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Init => {
            AppState::open(&config).await?;
            println!("Initialized docshelf in {}", config.data_dir.display());
        }
        Commands::User { command } => match command {
            UserCommands::Add { email, name } => {
                let directory = Directory::new(open_store(&config).await?);
                let (user, token) = directory.create_user(&email, &name).await?;

                println!();
                println!("========================================");
                println!("Created user '{}' ({})", user.email, user.id);
                println!("Token (save this, it won't be shown again):");
                println!();
                println!("  {token}");
                println!();
                println!("========================================");
                println!();
            }
        },
        Commands::Reindex => {
            let state = AppState::open(&config).await?;
            let indexed = state.docs.reindex_all().await?;
            println!("Reindexed {indexed} documents");
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let state = Arc::new(AppState::open(&config).await?);
            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
