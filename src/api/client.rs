//! HTTP client for the Cuide-Se REST backend.
//!
//! Attaches the persisted bearer token to every request and applies the
//! forced-logout protocol: a 401 response purges persisted credentials and
//! signals the host to navigate to its login entry point. Requests are not
//! retried and no backoff is applied.

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::warn;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::CredentialStore;

use super::types::Page;

/// Receives the forced-logout signal when the backend rejects our
/// credentials. Fired exactly once per rejected response, after the
/// persisted credentials have been cleared.
pub trait AuthHandler: Send + Sync {
  /// Navigate the host application to its login entry point.
  fn redirect_to_login(&self);
}

pub struct ApiClient<C: CredentialStore> {
  http: reqwest::Client,
  base_url: Url,
  session: Arc<C>,
  auth_handler: Option<Arc<dyn AuthHandler>>,
}

impl<C: CredentialStore> ApiClient<C> {
  pub fn new(config: &Config, session: Arc<C>) -> Result<Self> {
    let mut base_url = Url::parse(&config.api.base_url)
      .map_err(|e| Error::Unknown(format!("invalid base URL {}: {}", config.api.base_url, e)))?;

    // Url::join drops the last path segment unless the base ends with '/'
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    Ok(Self {
      http: reqwest::Client::new(),
      base_url,
      session,
      auth_handler: None,
    })
  }

  /// Register the handler notified when the backend forces a logout.
  pub fn with_auth_handler(mut self, handler: Arc<dyn AuthHandler>) -> Self {
    self.auth_handler = Some(handler);
    self
  }

  pub fn session(&self) -> &Arc<C> {
    &self.session
  }

  /// GET a JSON resource.
  pub async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(String, String)],
  ) -> Result<T> {
    let request = self.http.request(Method::GET, self.endpoint(path)?).query(query);
    self.execute(request).await
  }

  /// POST a JSON body, returning the decoded response.
  pub async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
    let request = self.http.request(Method::POST, self.endpoint(path)?).json(body);
    self.execute(request).await
  }

  /// PUT a JSON body, returning the decoded response.
  pub async fn put_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
    let request = self.http.request(Method::PUT, self.endpoint(path)?).json(body);
    self.execute(request).await
  }

  /// DELETE a resource. The response body, if any, is discarded.
  pub async fn delete(&self, path: &str) -> Result<()> {
    let request = self.http.request(Method::DELETE, self.endpoint(path)?);
    let response = self.send(request).await?;
    self.check_status(response).await?;
    self.session.touch_last_active()?;
    Ok(())
  }

  /// Drain a paginated list endpoint into a single vector.
  pub async fn get_paged<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(String, String)],
  ) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut offset = 0u64;
    let limit = 50u64;

    loop {
      let mut page_query = query.to_vec();
      page_query.push(("offset".to_string(), offset.to_string()));
      page_query.push(("limit".to_string(), limit.to_string()));

      let page: Page<T> = self.get_json(path, &page_query).await?;
      let count = page.items.len() as u64;
      items.extend(page.items);

      if count == 0 || offset + count >= page.total {
        break;
      }
      // Servers may cap pages below the requested limit; advance by what
      // actually came back so no range is skipped.
      offset += count;
    }

    Ok(items)
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| Error::Unknown(format!("invalid endpoint path {}: {}", path, e)))
  }

  async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
    let response = self.send(request).await?;
    let response = self.check_status(response).await?;
    self.session.touch_last_active()?;

    response
      .json::<T>()
      .await
      .map_err(|e| Error::Decode(e.to_string()))
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response> {
    let request = match self.session.token()? {
      Some(token) => request.bearer_auth(token),
      None => request,
    };

    request.send().await.map_err(|e| Error::Network(e.to_string()))
  }

  async fn check_status(&self, response: Response) -> Result<Response> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
      warn!("credentials rejected by backend, clearing session");
      self.session.clear_credentials()?;
      if let Some(handler) = &self.auth_handler {
        handler.redirect_to_login();
      }
      return Err(Error::Auth);
    }

    if !status.is_success() {
      return Err(Error::Network(format!("request failed with status {}", status)));
    }

    Ok(response)
  }
}

impl<C: CredentialStore> Clone for ApiClient<C> {
  fn clone(&self) -> Self {
    Self {
      http: self.http.clone(),
      base_url: self.base_url.clone(),
      session: Arc::clone(&self.session),
      auth_handler: self.auth_handler.clone(),
    }
  }
}
