//! Read-through storefront collections
//!
//! Public list pages are fetched anonymously through the shared [`Catalog`]
//! and cached, so the revalidation webhook has something to invalidate.

use crate::catalog::Catalog;
use crate::client::Resource;
use crate::{AppState, HttpError};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use cartjo_core::{DEFAULT_PAGE_LIMIT, ListQuery, Locale, Page, Record};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CatalogParams {
    /// Page size
    pub limit: Option<u32>,
    /// `_id` of the last record of the previous page
    pub last_id: Option<String>,
    pub search: Option<String>,
    /// `ar` or `en`
    pub lang: Option<String>,
}

/// One list page in the backend's shape, plus the cursor for the next one
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    pub is_success: bool,
    pub message: String,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Record>,
    pub data_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl From<Page<Record>> for CatalogPage {
    fn from(page: Page<Record>) -> Self {
        Self {
            next_cursor: page.next_cursor().map(str::to_string),
            is_success: page.is_success,
            message: page.message,
            data: page.data,
            data_count: page.data_count,
        }
    }
}

/// Public collections only; anything behind a sign-in is not served here
fn public_resource(name: &str) -> Result<Resource, HttpError> {
    name.parse::<Resource>()
        .ok()
        .filter(|resource| !resource.requires_auth())
        .ok_or_else(|| HttpError::NotFound(format!("/api/v1/{name}")))
}

fn list_query(params: CatalogParams, default_locale: Locale) -> Result<ListQuery, HttpError> {
    let locale = match params.lang.as_deref() {
        Some(lang) => lang
            .parse::<Locale>()
            .map_err(|e| HttpError::BadRequest(e.to_string()))?,
        None => default_locale,
    };
    let mut query = ListQuery::new(locale, params.limit.unwrap_or(DEFAULT_PAGE_LIMIT));
    query.last_id = params.last_id.filter(|id| !id.is_empty());
    if let Some(search) = params.search {
        query = query.search(search);
    }
    Ok(query)
}

/// List one page of a public collection
#[utoipa::path(
    get,
    path = "/api/v1/{resource}",
    params(
        ("resource" = String, Path, description = "Collection name, e.g. products"),
        CatalogParams,
    ),
    responses(
        (status = 200, description = "One list page", body = CatalogPage),
        (status = 400, description = "Invalid query", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown or protected collection", body = crate::error::ErrorResponse),
        (status = 502, description = "Backend failure", body = crate::error::ErrorResponse),
    ),
    tag = "catalog"
)]
#[instrument(name = "catalog_list", skip(state, params))]
pub async fn list_collection(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<CatalogPage>, HttpError> {
    let catalog: &Catalog = state
        .catalog
        .as_ref()
        .ok_or_else(|| HttpError::NotFound(format!("/api/v1/{resource}")))?;
    let resource = public_resource(&resource)?;
    let query = list_query(params, state.default_locale)?;

    let page = catalog.list::<Record>(resource, &query).await?;
    Ok(Json(page.into()))
}

pub fn add_routes(router: OpenApiRouter<AppState>) -> OpenApiRouter<AppState> {
    router.routes(routes!(list_collection))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(lang: Option<&str>, last_id: Option<&str>) -> CatalogParams {
        CatalogParams {
            limit: None,
            last_id: last_id.map(str::to_string),
            search: None,
            lang: lang.map(str::to_string),
        }
    }

    #[test]
    fn test_protected_collections_are_hidden() {
        assert_eq!(public_resource("products").unwrap(), Resource::Products);
        assert!(matches!(public_resource("orders"), Err(HttpError::NotFound(_))));
        assert!(matches!(public_resource("nope"), Err(HttpError::NotFound(_))));
    }

    #[test]
    fn test_query_defaults() {
        let query = list_query(params(None, Some("")), Locale::En).unwrap();
        assert_eq!(query.locale, Locale::En);
        assert_eq!(query.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(query.last_id, None);

        let query = list_query(params(Some("ar"), Some("p3")), Locale::En).unwrap();
        assert_eq!(query.locale, Locale::Ar);
        assert_eq!(query.last_id.as_deref(), Some("p3"));

        assert!(matches!(
            list_query(params(Some("fr"), None), Locale::En),
            Err(HttpError::BadRequest(_))
        ));
    }
}
