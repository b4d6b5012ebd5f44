use anyhow::Result;
use clap::Parser;
use contactbook::{db::Db, router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "contactbook", about = "Contact management REST API")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    /// SQLite database path
    #[arg(long, env = "CONTACTS_DB", default_value = "data/contacts.db")]
    db: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("contactbook=info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Some(parent) = std::path::Path::new(&cli.db).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let db = Db::open(&cli.db)?;
    if db.is_empty() {
        info!("empty database, inserting seed contacts");
        db.seed()?;
    }

    let app = router(db);

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("contact API listening on http://localhost:{}", cli.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C signal handler");
            info!("shutting down...");
        })
        .await?;

    Ok(())
}
