/// Skythread - load a Bluesky post thread from the command line
use anyhow::Context;
use clap::Parser;
use skythread::{
    store::StoreOptions, ApiClient, AuthenticatedClient, ClientConfig, HandleCache, KvStore,
    SessionManager, SqliteKvStore, ThreadLoader, ThreadRequest, Xrpc,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Print a post thread as JSON
#[derive(Parser, Debug)]
#[command(name = "skythread")]
#[command(about = "Load a Bluesky post thread", long_about = None)]
struct Args {
    /// Post URL (https://bsky.app/profile/<author>/post/<id>), an at:// URI,
    /// or an author handle/DID when RECORD_KEY is given
    target: Option<String>,

    /// Post record key, making TARGET the author
    record_key: Option<String>,

    /// Print the post record and its author's profile for this at:// URI
    #[arg(long, conflicts_with_all = ["target", "record_key"])]
    post: Option<String>,

    /// Read through the logged-in PDS session instead of the public AppView
    #[arg(long)]
    auth: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ClientConfig::from_env()?;

    // Initialize logging; stdout is reserved for the JSON output
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("skythread={}", config.logging.level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let store = SqliteKvStore::open(&config.storage.store_db, StoreOptions::default())
        .await
        .context("Failed to open the local store")?;
    let kv: Arc<dyn KvStore> = Arc::new(store.clone());

    let api: Arc<dyn Xrpc> = if args.auth {
        Arc::new(authenticated_client(&config, Arc::clone(&kv)).await?)
    } else {
        info!("Using AppView at {}", config.network.appview_url);
        Arc::new(ApiClient::new(&config.network.appview_url, &config.network)?)
    };

    let loader = ThreadLoader::new(api, Arc::new(HandleCache::new(kv)));

    let output = match (args.post, args.target, args.record_key) {
        (Some(post_uri), _, _) => {
            serde_json::to_value(loader.load_raw_post_with_author(&post_uri).await?)?
        }
        (None, Some(author), Some(record_key)) => {
            loader
                .load_thread(&ThreadRequest::Id { author, record_key })
                .await?
        }
        (None, Some(url), None) => loader.load_thread(&ThreadRequest::Url(url)).await?,
        (None, None, _) => anyhow::bail!("Give a post URL, or an author and a record key"),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    store.close().await;
    Ok(())
}

/// Restore the saved session, or log in with configured credentials
async fn authenticated_client(
    config: &ClientConfig,
    store: Arc<dyn KvStore>,
) -> anyhow::Result<AuthenticatedClient> {
    let pds = ApiClient::new(&config.network.pds_url, &config.network)?;
    let sessions = Arc::new(SessionManager::new(pds, store));

    if sessions.restore().await?.is_none() {
        let (identifier, password) = config
            .auth
            .credentials()
            .context("No saved session; set SKYTHREAD_IDENTIFIER and SKYTHREAD_APP_PASSWORD")?;
        sessions.login(identifier, password).await?;
    }

    info!("Using PDS at {}", config.network.pds_url);
    Ok(AuthenticatedClient::new(sessions))
}
