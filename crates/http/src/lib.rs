//! CartJO backend client, session coordination and storefront server
//!
//! With the `client` feature this crate talks to the backend REST API: the
//! authenticated fetch wrapper ([`client::ApiClient`]), the session context
//! with its single-flight token refresh ([`session::SessionContext`]) and the
//! cached, cursor-paginated resource access built on both
//! ([`catalog::Catalog`]). The `server` feature builds on it: cached
//! read-through routes for public collections and the revalidation webhook
//! that invalidates the shared [`cache::QueryCache`].

pub mod cache;
pub mod error;

#[cfg(feature = "client")]
pub mod catalog;
#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub mod session;

#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod state;

pub use cache::{QueryCache, QueryKey};
pub use error::{HttpError, Result};

#[cfg(feature = "client")]
pub use catalog::{Catalog, Paginator};
#[cfg(feature = "client")]
pub use client::{ApiClient, ClientError, RequestOptions, Resource};
#[cfg(feature = "client")]
pub use session::{SessionCodec, SessionContext, SessionError, SessionState};

#[cfg(feature = "server")]
pub use state::AppState;

#[cfg(feature = "server")]
pub use utoipa::OpenApi;
