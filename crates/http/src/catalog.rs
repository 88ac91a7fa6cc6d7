//! Session-aware access to backend resources
//!
//! [`Catalog`] ties the API client to the session context and the query
//! cache: it picks the bearer token per resource, caches public list pages,
//! drops a collection's cached pages after a mutation and reports rejected
//! tokens back to the session.

use crate::cache::{QueryCache, QueryKey};
use crate::client::auth::LoginRequest;
use crate::client::{ApiClient, ClientError, RequestOptions, Resource};
use crate::session::{SessionContext, SessionError};
use cartjo_core::{Identified, ListQuery, Locale, Page, UserClaims};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone, Debug)]
pub struct Catalog {
    client: Arc<ApiClient>,
    session: Arc<SessionContext>,
    cache: Arc<QueryCache>,
}

impl Catalog {
    pub fn new(client: Arc<ApiClient>, session: Arc<SessionContext>, cache: Arc<QueryCache>) -> Self {
        Self {
            client,
            session,
            cache,
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Sign in and start a session from the issued tokens
    ///
    /// # Errors
    ///
    /// Propagates the login call's failure, or a [`SessionError`] when the
    /// issued tokens carry no expiry or no readable claims.
    pub async fn login(
        &self,
        credentials: &LoginRequest,
        locale: Locale,
    ) -> Result<UserClaims, ClientError> {
        let issued_at = self.session.now_ms();
        let response = self
            .client
            .login(credentials, RequestOptions::new(locale))
            .await?;
        let token = response.into_session_token(issued_at, None)?;
        Ok(self.session.sign_in(token)?)
    }

    /// Fetch one list page; public collections are served from cache when fresh
    ///
    /// # Errors
    ///
    /// Invalid queries fail before any network call. Protected collections
    /// need a live session.
    #[instrument(skip(self, resource, query), fields(resource = %resource))]
    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: Resource,
        query: &ListQuery,
    ) -> Result<Page<T>, ClientError> {
        let key = QueryKey::new(resource.name(), query.to_query_pairs()?);
        let cacheable = !resource.requires_auth();

        if cacheable {
            if let Some(body) = self.cache.get(&key).await {
                return Ok(resource.list_key().normalize(body)?);
            }
        }

        let token = self.token_for_read(resource).await?;
        let body = self.observe(self.client.list_raw(resource, query, token.as_deref()).await)?;
        let page = resource.list_key().normalize(body.clone())?;
        if cacheable {
            self.cache.insert(key, body).await;
        }
        Ok(page)
    }

    /// Fetch one record by id
    pub async fn get<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
        locale: Locale,
    ) -> Result<T, ClientError> {
        let token = self.token_for_read(resource).await?;
        let result = self
            .client
            .get(resource, id, token.as_deref(), RequestOptions::new(locale))
            .await;
        self.observe(result)
    }

    /// Create a record and drop the collection's cached pages
    pub async fn create<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        resource: Resource,
        body: &B,
        locale: Locale,
    ) -> Result<T, ClientError> {
        let token = self.session.get_valid_token().await?;
        let result = self
            .client
            .create(resource, body, &token, RequestOptions::new(locale))
            .await;
        let created = self.observe(result)?;
        self.cache.invalidate_tag(resource.name()).await;
        Ok(created)
    }

    /// Update a record and drop the collection's cached pages
    pub async fn update<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
        body: &B,
        locale: Locale,
    ) -> Result<T, ClientError> {
        let token = self.session.get_valid_token().await?;
        let result = self
            .client
            .update(resource, id, body, &token, RequestOptions::new(locale))
            .await;
        let updated = self.observe(result)?;
        self.cache.invalidate_tag(resource.name()).await;
        Ok(updated)
    }

    /// Delete a record and drop the collection's cached pages
    pub async fn delete(
        &self,
        resource: Resource,
        id: &str,
        locale: Locale,
    ) -> Result<String, ClientError> {
        let token = self.session.get_valid_token().await?;
        let result = self
            .client
            .delete(resource, id, &token, RequestOptions::new(locale))
            .await;
        let message = self.observe(result)?;
        self.cache.invalidate_tag(resource.name()).await;
        Ok(message)
    }

    /// Page through `resource` starting at the first page of `query`
    pub fn paginate<T>(&self, resource: Resource, query: ListQuery) -> Paginator<'_, T> {
        Paginator {
            catalog: self,
            resource,
            cursor: query.last_id.clone(),
            query,
            exhausted: false,
            _item: PhantomData,
        }
    }

    /// Protected collections need a token; public ones send it when available
    async fn token_for_read(&self, resource: Resource) -> Result<Option<String>, ClientError> {
        if resource.requires_auth() {
            return Ok(Some(self.session.get_valid_token().await?));
        }
        if !self.session.is_signed_in() {
            return Ok(None);
        }
        match self.session.get_valid_token().await {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                debug!(error = %e, "reading public resource anonymously");
                Ok(None)
            }
        }
    }

    fn observe<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(ClientError::Session(SessionError::Unauthorized { status })) = &result {
            self.session.report_unauthorized(*status);
        }
        result
    }
}

/// Cursor-driven walk over a list endpoint
///
/// Each call to [`Paginator::next_page`] continues after the last `_id` of
/// the previous page. A short page is not the end; the walk stops at the
/// first empty page.
pub struct Paginator<'a, T> {
    catalog: &'a Catalog,
    resource: Resource,
    query: ListQuery,
    cursor: Option<String>,
    exhausted: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned + Identified> Paginator<'_, T> {
    /// Fetch the next page, or `None` once the list is exhausted
    ///
    /// # Errors
    ///
    /// A failed fetch leaves the cursor where it was, so the call can be
    /// repeated.
    pub async fn next_page(&mut self) -> Result<Option<Page<T>>, ClientError> {
        if self.exhausted {
            return Ok(None);
        }
        let query = self.query.after(self.cursor.as_deref());
        let page = self.catalog.list::<T>(self.resource, &query).await?;
        if page.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        self.cursor = page.next_cursor().map(str::to_string);
        Ok(Some(page))
    }

    pub const fn has_next_page(&self) -> bool {
        !self.exhausted
    }

    /// `lastId` the next request will send
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}
