//! Application state management

use crate::Catalog;
use crate::cache::QueryCache;
use cartjo_core::{CartConfig, Locale};
use std::sync::Arc;

/// Shared state of the storefront server
#[derive(Clone, Debug)]
pub struct AppState {
    /// Cache the webhook invalidates
    pub cache: Arc<QueryCache>,
    /// Anonymous backend access for the read-through routes
    pub catalog: Option<Catalog>,
    /// `REVALIDATION_SECRET`; while unset every revalidation is refused
    pub revalidation_secret: Option<Arc<str>>,
    /// Language used when a read omits `lang`
    pub default_locale: Locale,
}

impl AppState {
    pub fn new(cache: Arc<QueryCache>, revalidation_secret: Option<String>) -> Self {
        Self {
            cache,
            catalog: None,
            revalidation_secret: revalidation_secret
                .filter(|secret| !secret.is_empty())
                .map(Arc::from),
            default_locale: Locale::default(),
        }
    }

    pub fn from_config(cache: Arc<QueryCache>, config: &CartConfig) -> Self {
        Self {
            default_locale: config.default_locale,
            ..Self::new(cache, config.revalidation_secret.clone())
        }
    }

    /// Serve reads through `catalog`; the webhook then invalidates the
    /// catalog's cache
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.cache = Arc::clone(catalog.cache());
        self.catalog = Some(catalog);
        self
    }
}
