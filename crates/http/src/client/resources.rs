//! Catalog and dashboard resources exposed under `/api/v1`

use super::{ApiClient, ClientError, RequestOptions};
use cartjo_core::{ListKey, ListQuery, Page};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use tracing::instrument;

/// Backend resource collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Categories,
    Products,
    Orders,
    Users,
    Banners,
    Logos,
    Locations,
    Showcases,
    TypeHints,
}

impl Resource {
    pub const ALL: [Self; 9] = [
        Self::Categories,
        Self::Products,
        Self::Orders,
        Self::Users,
        Self::Banners,
        Self::Logos,
        Self::Locations,
        Self::Showcases,
        Self::TypeHints,
    ];

    /// Name used in paths and as the cache tag
    pub const fn name(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Products => "products",
            Self::Orders => "orders",
            Self::Users => "users",
            Self::Banners => "banners",
            Self::Logos => "logos",
            Self::Locations => "locations",
            Self::Showcases => "showcases",
            Self::TypeHints => "type-hints",
        }
    }

    pub fn path(self) -> String {
        format!("/api/v1/{}", self.name())
    }

    pub fn item_path(self, id: &str) -> String {
        format!("/api/v1/{}/{id}", self.name())
    }

    /// Field the list endpoint keys its records under
    pub const fn list_key(self) -> ListKey {
        match self {
            Self::Users => ListKey::Users,
            Self::Locations => ListKey::Locations,
            _ => ListKey::Data,
        }
    }

    /// Whether reading this collection needs a signed-in user.
    ///
    /// Storefront collections are public; mutations always need a token.
    pub const fn requires_auth(self) -> bool {
        matches!(self, Self::Orders | Self::Users | Self::TypeHints)
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|r| r.name() == wanted)
            .ok_or_else(|| ClientError::Configuration(format!("unknown resource: {s}")))
    }
}

impl ApiClient {
    /// Fetch the raw body of one list page
    #[instrument(name = "list_raw", skip(self, resource, token, query), fields(resource = %resource, last_id = ?query.last_id))]
    pub async fn list_raw(
        &self,
        resource: Resource,
        query: &ListQuery,
        token: Option<&str>,
    ) -> Result<JsonValue, ClientError> {
        let pairs = query.to_query_pairs()?;
        let req = self
            .request(Method::GET, &resource.path(), token)
            .query(&pairs);
        self.execute(req, RequestOptions::new(query.locale)).await
    }

    /// Fetch one page of a list endpoint, normalized to [`Page`]
    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        query: &ListQuery,
        token: Option<&str>,
    ) -> Result<Page<T>, ClientError> {
        let body = self.list_raw(resource, query, token).await?;
        Ok(resource.list_key().normalize(body)?)
    }

    /// Fetch one record by id
    #[instrument(name = "get_resource", skip(self, resource, token, options), fields(resource = %resource))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
        token: Option<&str>,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let req = self.request(Method::GET, &resource.item_path(id), token);
        self.execute_data(req, options).await
    }

    /// Create a record
    #[instrument(name = "create_resource", skip(self, resource, token, body, options), fields(resource = %resource))]
    pub async fn create<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        resource: Resource,
        body: &B,
        token: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let req = self
            .request(Method::POST, &resource.path(), Some(token))
            .json(body);
        self.execute_data(req, options).await
    }

    /// Update a record
    #[instrument(name = "update_resource", skip(self, resource, token, body, options), fields(resource = %resource))]
    pub async fn update<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
        body: &B,
        token: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let req = self
            .request(Method::PATCH, &resource.item_path(id), Some(token))
            .json(body);
        self.execute_data(req, options).await
    }

    /// Delete a record; the envelope's message is returned
    #[instrument(name = "delete_resource", skip(self, resource, token, options), fields(resource = %resource))]
    pub async fn delete(
        &self,
        resource: Resource,
        id: &str,
        token: &str,
        options: RequestOptions,
    ) -> Result<String, ClientError> {
        let req = self.request(Method::DELETE, &resource.item_path(id), Some(token));
        let envelope = self
            .execute::<super::Envelope<JsonValue>>(req, options)
            .await?
            .ensure_success()?;
        Ok(envelope.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_and_keys() {
        assert_eq!(Resource::TypeHints.path(), "/api/v1/type-hints");
        assert_eq!(Resource::Products.item_path("p1"), "/api/v1/products/p1");
        assert_eq!(Resource::Users.list_key(), ListKey::Users);
        assert_eq!(Resource::Locations.list_key(), ListKey::Locations);
        assert_eq!(Resource::Banners.list_key(), ListKey::Data);
    }

    #[test]
    fn test_parse_resource_names() {
        assert_eq!("type_hints".parse::<Resource>().unwrap(), Resource::TypeHints);
        assert_eq!("Products".parse::<Resource>().unwrap(), Resource::Products);
        assert!("widgets".parse::<Resource>().is_err());
    }
}
