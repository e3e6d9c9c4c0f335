//! REST API Client
//!
//! Thin reqwest wrapper for the CRM backend: paged list reads plus the
//! create/update/delete calls the optimistic mutator waits on.
//!
//! ```text
//! GET    {base}/{resource}?ownerId=&searchQuery=&<filter>=&page=&limit=
//! POST   {base}/{resource}
//! PATCH  {base}/{resource}/{id}
//! DELETE {base}/{resource}/{id}
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::debug;

use crate::domain::{ApiConfig, EntityKind, Record};
use crate::error::{Error, Result};
use crate::services::RetryPolicy;
use crate::sync::{PageFetcher, PageRequest};

/// HTTP client bound to one backend
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: &ApiConfig, retry: RetryPolicy) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Invalid {
                message: "API base URL is empty".to_string(),
            });
        }

        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a resource collection
    pub fn resource_url(&self, kind: EntityKind) -> String {
        format!("{}/{}", self.base_url, kind.resource())
    }

    /// URL of a single record
    pub fn record_url(&self, kind: EntityKind, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, kind.resource(), id)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetch one page, retrying transient failures
    pub async fn fetch_page<R: Record>(&self, request: &PageRequest) -> Result<Vec<R>> {
        let label = format!("GET {} page {}", request.key.kind(), request.page);
        self.retry
            .run(&label, move || self.get_page::<R>(request))
            .await
    }

    async fn get_page<R: Record>(&self, request: &PageRequest) -> Result<Vec<R>> {
        let url = self.resource_url(request.key.kind());
        debug!(url = %url, key = %request.key, page = request.page, "GET page");

        let response = self
            .authorize(self.http.get(&url))
            .query(&request.query_pairs())
            .send()
            .await?;
        let records = check(response).await?.json::<Vec<R>>().await?;

        if records.len() > request.limit as usize {
            return Err(Error::Invalid {
                message: format!(
                    "{} returned {} records for a page of {}",
                    url,
                    records.len(),
                    request.limit
                ),
            });
        }
        Ok(records)
    }

    /// Create a record; returns what the backend stored
    pub async fn create<R: Record, B: Serialize + ?Sized>(&self, body: &B) -> Result<R> {
        let url = self.resource_url(R::KIND);
        debug!(url = %url, "POST");
        let response = self.authorize(self.http.post(&url)).json(body).send().await?;
        Ok(check(response).await?.json::<R>().await?)
    }

    /// Partially update a record; returns the updated record
    pub async fn update<R: Record, B: Serialize + ?Sized>(&self, id: &str, body: &B) -> Result<R> {
        let url = self.record_url(R::KIND, id);
        debug!(url = %url, "PATCH");
        let response = self.authorize(self.http.patch(&url)).json(body).send().await?;
        Ok(check(response).await?.json::<R>().await?)
    }

    /// Delete a record
    pub async fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::Mutation {
                message: format!("cannot delete from {kind} without an id"),
            });
        }
        let url = self.record_url(kind, id);
        debug!(url = %url, "DELETE");
        let response = self.authorize(self.http.delete(&url)).send().await?;
        check(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

/// Map a non-success response to [`Error::Api`], keeping the body as message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body.trim().to_string()
    };
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

/// Page fetcher for one record type over the REST API
pub struct RestFetcher<R> {
    api: Arc<ApiClient>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RestFetcher<R> {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            _record: PhantomData,
        }
    }
}

impl<R: Record> PageFetcher for RestFetcher<R> {
    type Record = R;

    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'static, Result<Vec<R>>> {
        debug_assert_eq!(request.key.kind(), R::KIND, "key kind must match record kind");
        let api = self.api.clone();
        Box::pin(async move { api.fetch_page::<R>(&request).await })
    }
}
