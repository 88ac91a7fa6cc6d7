//! CartJO core types and utilities
//!
//! Transport-independent pieces of the storefront client layer: session and
//! claims types, the paginated envelope with its cursor convention, render
//! state derivation, locale routing, configuration and tracing setup.

pub mod config;
pub mod error;
pub mod error_view;
pub mod locale;
pub mod pagination;
pub mod random;
pub mod telemetry;
pub mod types;
pub mod ui_state;

pub use config::{CartConfig, EnvType};
pub use error::{CoreError, CoreResult};
pub use error_view::ErrorView;
pub use locale::{AUTH_ROUTE, Locale, Message};
pub use pagination::{DEFAULT_PAGE_LIMIT, Identified, ListKey, ListQuery, Page, Record, next_cursor};
pub use random::get_random_items;
pub use types::{REFRESH_BUFFER_MS, SessionToken, TokenError, UserClaims};
pub use ui_state::{QueryFlags, RenderState, UiState, derive_ui_state};
