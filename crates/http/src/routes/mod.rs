//! API route definitions
use crate::AppState;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

pub mod catalog;
pub mod health;
pub mod revalidate;

#[derive(OpenApi)]
#[openapi(
    info(title = "CartJO storefront API", description = "Storefront reads, cache revalidation and health"),
    tags(
        (name = "catalog", description = "Cached public collections"),
        (name = "health", description = "Liveness"),
        (name = "revalidate", description = "Query cache invalidation"),
    ),
)]
struct ApiDoc;

/// Every route with its OpenAPI description
pub fn router() -> OpenApiRouter<AppState> {
    let router = OpenApiRouter::with_openapi(ApiDoc::openapi());
    let router = health::add_routes(router);
    let router = catalog::add_routes(router);
    revalidate::add_routes(router)
}
