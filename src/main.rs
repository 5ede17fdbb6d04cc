use clap::Parser;
use sqlreact::agents::AgentHandler;
use sqlreact::cli::{Cli, Command};
use sqlreact::config::Settings;
use sqlreact::persistence::{seed_company_database, DatabaseTarget, SchemaCatalog};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let settings = Settings::new_with_cli(&cli)?;

    match cli.command() {
        Command::Serve => serve(settings).await,
        Command::Ask { question, json } => ask(settings, &question, json).await,
        Command::Seed { path } => {
            let path = path.unwrap_or_else(|| settings.database.path.clone());
            seed_company_database(&path).await?;
            println!("Created demo database at {}", path.display());
            Ok(())
        }
        Command::Schema => {
            let target = DatabaseTarget::new(&settings.database.path)?;
            let mut conn = target.connect_read_only().await?;
            let schema = SchemaCatalog::extract(&mut conn).await?;
            println!("{}", schema);
            Ok(())
        }
    }
}

fn agent_handler(settings: &Settings) -> Arc<AgentHandler> {
    Arc::new(AgentHandler::new(settings.agent.clone(), settings.llm.clone()))
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting sqlreact on {}:{}", host, port);

    let handler = agent_handler(&settings);

    // Initialize the configured database up front when it exists; otherwise wait for /init
    if settings.database.path.is_file() {
        match handler.initialize(&settings.database.path).await {
            Ok(report) => info!("Agent ready for {}", report.db_path.display()),
            Err(e) => warn!("Agent not initialized at startup: {}", e),
        }
    } else {
        info!(
            "No database at {}; waiting for /init",
            settings.database.path.display()
        );
    }

    let app = sqlreact::create_app(handler, &settings);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ask(settings: Settings, question: &str, json: bool) -> anyhow::Result<()> {
    let handler = agent_handler(&settings);
    handler.initialize(&settings.database.path).await?;

    let result = handler.run_query(question).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.message());
    }

    if result.is_success() {
        Ok(())
    } else {
        anyhow::bail!("Run ended with status {:?}", result.status)
    }
}
