//! CLI commands

use anyhow::{Context, Result, bail};
use cartjo_core::{CartConfig, ListQuery, Locale, Record};
use cartjo_http::client::auth::LoginRequest;
use cartjo_http::server;
use cartjo_http::session::{SessionCodec, SessionContext};
use cartjo_http::{ApiClient, AppState, Catalog, QueryCache, Resource};
use clap::Subcommand;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Serve cached storefront reads and the revalidation webhook
    Serve {
        /// Bind address (defaults to CARTJO_BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Seconds between sweeps of expired cache entries
        #[arg(long, default_value = "60")]
        gc_interval: u64,
    },

    /// Sign in and store the sealed session
    Login {
        /// Account email
        #[arg(long, conflicts_with = "phone", required_unless_present = "phone")]
        email: Option<String>,

        /// Account phone number
        #[arg(long)]
        phone: Option<String>,

        /// Account password
        #[arg(long, env = "CARTJO_PASSWORD", hide_env_values = true)]
        password: String,

        /// Where to write the sealed session
        #[arg(long, default_value = config::DEFAULT_SESSION_FILE)]
        session_file: PathBuf,
    },

    /// Page through a backend collection and print it as JSON lines
    List {
        /// Collection name, e.g. products or type-hints
        resource: Resource,

        /// Page size
        #[arg(long, default_value = "10")]
        limit: u32,

        /// Search term
        #[arg(long)]
        search: Option<String>,

        /// Stop after this many pages (0 = until exhausted)
        #[arg(long, default_value = "1")]
        pages: usize,

        /// Response language (defaults to CARTJO_DEFAULT_LOCALE)
        #[arg(long)]
        locale: Option<Locale>,

        /// Sealed session used for protected collections
        #[arg(long, default_value = config::DEFAULT_SESSION_FILE)]
        session_file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

impl Commands {
    pub const fn is_long_running(&self) -> bool {
        matches!(self, Self::Serve { .. })
    }

    pub async fn execute(self, config: CartConfig) -> Result<()> {
        match self {
            Self::Serve { bind, gc_interval } => serve(&config, bind, gc_interval).await,
            Self::Login {
                email,
                phone,
                password,
                session_file,
            } => {
                let credentials = match (email, phone) {
                    (Some(email), _) => LoginRequest::with_email(email, password),
                    (None, Some(phone)) => LoginRequest::with_phone(phone, password),
                    (None, None) => bail!("either --email or --phone is required"),
                };
                login(&config, &credentials, &session_file).await
            }
            Self::List {
                resource,
                limit,
                search,
                pages,
                locale,
                session_file,
            } => {
                let mut query = ListQuery::new(locale.unwrap_or(config.default_locale), limit);
                if let Some(search) = search {
                    query = query.search(search);
                }
                list(&config, resource, query, pages, &session_file).await
            }
            Self::Config => {
                println!("{}", serde_json::to_string_pretty(&config::redacted(&config))?);
                Ok(())
            }
        }
    }
}

async fn serve(config: &CartConfig, bind: Option<SocketAddr>, gc_interval: u64) -> Result<()> {
    if config.revalidation_secret.is_none() {
        warn!("REVALIDATION_SECRET is not set; every revalidation will be refused");
    }
    let client = Arc::new(ApiClient::from_config(config)?);
    let session = Arc::new(SessionContext::from_config(client.clone(), config));
    let cache = Arc::new(QueryCache::new());
    let gc = cache.spawn_gc(Duration::from_secs(gc_interval.max(1)));
    let catalog = Catalog::new(client, session, Arc::clone(&cache));
    let state = AppState::from_config(cache, config).with_catalog(catalog);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for shutdown signal: {e}");
        }
        info!("shutting down");
    };
    let result = server::serve(bind.unwrap_or(config.bind_addr), state, shutdown).await;
    gc.abort();
    result.context("storefront server failed")
}

/// Catalog wired to the configured backend, with the saved session if any
async fn catalog(config: &CartConfig, session_file: &Path) -> Result<(Catalog, Option<SessionCodec>)> {
    let client = Arc::new(ApiClient::from_config(config)?);
    let session = Arc::new(SessionContext::from_config(client.clone(), config));
    session.on_session_invalid(|reason| {
        warn!("session ended ({reason}); run `cartjo login` again");
    });

    let codec = SessionCodec::from_config(config).ok();
    if let Some(codec) = &codec {
        match config::load_session(codec, session_file).await {
            Ok(Some(saved)) => {
                if let Err(e) = session.restore(saved) {
                    warn!("ignoring saved session: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => warn!("ignoring unreadable session file: {e:#}"),
        }
    }
    let catalog = Catalog::new(client, session, Arc::new(QueryCache::new()));
    Ok((catalog, codec))
}

async fn login(config: &CartConfig, credentials: &LoginRequest, session_file: &Path) -> Result<()> {
    let codec = SessionCodec::from_config(config).context("login needs NEXTAUTH_SECRET to seal the session")?;
    let (catalog, _) = catalog(config, session_file).await?;

    let user = catalog.login(credentials, config.default_locale).await?;
    let session = catalog
        .session()
        .snapshot()
        .context("session was not stored after sign-in")?;
    config::save_session(&codec, &session, session_file).await?;

    info!(user_id = %user.id, admin = user.is_admin(), "signed in as {}", user.display_name());
    Ok(())
}

async fn list(
    config: &CartConfig,
    resource: Resource,
    query: ListQuery,
    max_pages: usize,
    session_file: &Path,
) -> Result<()> {
    let (catalog, codec) = catalog(config, session_file).await?;
    let mut pages = catalog.paginate::<Record>(resource, query);

    let mut fetched = 0;
    while max_pages == 0 || fetched < max_pages {
        let Some(page) = pages.next_page().await? else {
            break;
        };
        fetched += 1;
        for record in &page.data {
            println!("{}", serde_json::to_string(record)?);
        }
        info!(page = fetched, items = page.len(), total = page.data_count, cursor = ?pages.cursor(), "page fetched");
    }

    // Keep a refreshed token for the next run
    if let (Some(codec), Some(session)) = (codec, catalog.session().snapshot()) {
        config::save_session(&codec, &session, session_file).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartjo_core::SessionToken;
    use cartjo_http::session::SessionData;

    fn config(secret: &str) -> CartConfig {
        CartConfig {
            session_secret: Some(secret.to_string()),
            ..CartConfig::default()
        }
    }

    fn saved_session() -> SessionData {
        SessionData {
            token: SessionToken::issued("access", "refresh", 1_000, 900),
            user: serde_json::from_value(serde_json::json!({"id": "u1", "role": "user"})).unwrap(),
            signed_in_at: 1_000,
        }
    }

    #[tokio::test]
    async fn test_session_sealed_with_old_secret_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let session_file = dir.path().join("session");
        let old = SessionCodec::from_config(&config("old-secret")).unwrap();
        config::save_session(&old, &saved_session(), &session_file)
            .await
            .unwrap();

        let (catalog, codec) = catalog(&config("new-secret"), &session_file).await.unwrap();
        assert!(codec.is_some());
        assert!(!catalog.session().is_signed_in());
    }

    #[tokio::test]
    async fn test_corrupt_session_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let session_file = dir.path().join("session");
        tokio::fs::write(&session_file, "not a sealed session").await.unwrap();

        let (catalog, _) = catalog(&config("secret"), &session_file).await.unwrap();
        assert!(!catalog.session().is_signed_in());
    }
}
