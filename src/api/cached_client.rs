//! Marketplace client that wraps the HTTP client with transparent caching.

use std::sync::Arc;

use crate::cache::{CacheStore, Mutation, Operation, QueryCache, SqliteStore};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::{CredentialStore, SqliteSession};

use super::client::ApiClient;
use super::keys::ApiQueryKey;
use super::types::{
  Appointment, AppointmentStatus, AuthResponse, NewAppointment, NewReview, Professional,
  ProfessionalFilter, ProfileUpdate, Review, User,
};

/// Typed marketplace operations over the cache and HTTP client.
///
/// Reads go cache-first; writes run as mutations that invalidate the query
/// keys they outdate, so the next dependent read refetches.
pub struct MarketplaceClient<S: CacheStore, C: CredentialStore> {
  api: ApiClient<C>,
  cache: QueryCache<S>,
}

impl MarketplaceClient<SqliteStore, SqliteSession> {
  /// Create a client with on-disk cache and session stores.
  pub fn new(config: &Config) -> Result<Self> {
    let (store, session) = match &config.storage.data_dir {
      Some(dir) => (
        SqliteStore::open_at(&dir.join("cache.db"))?,
        SqliteSession::open_at(&dir.join("session.db"))?,
      ),
      None => (SqliteStore::open()?, SqliteSession::open()?),
    };

    let api = ApiClient::new(config, Arc::new(session))?;
    let cache = QueryCache::new(store)
      .with_stale_time(config.cache.stale_time())
      .with_evict_on_release(config.cache.evict_on_release);

    Ok(Self { api, cache })
  }
}

impl<S: CacheStore, C: CredentialStore> MarketplaceClient<S, C> {
  /// Assemble a client from explicit parts (custom stores, tests).
  pub fn from_parts(api: ApiClient<C>, cache: QueryCache<S>) -> Self {
    Self { api, cache }
  }

  pub fn cache(&self) -> &QueryCache<S> {
    &self.cache
  }

  pub fn session(&self) -> &Arc<C> {
    self.api.session()
  }

  // Auth ------------------------------------------------------------------

  /// Sign in and persist the bearer token and user for later requests.
  pub async fn login(&self, email: &str, password: &str) -> Result<User> {
    let body = serde_json::json!({ "email": email, "password": password });
    let auth: AuthResponse = self.api.post_json("auth/login", &body).await?;

    let session = self.api.session();
    session.set_token(&auth.token)?;
    session.set_user(&auth.user)?;

    Ok(auth.user)
  }

  /// Drop persisted credentials and every cached query result.
  pub async fn logout(&self) -> Result<()> {
    self.api.session().clear_credentials()?;
    self.cache.clear()
  }

  fn signed_in_user(&self) -> Result<User> {
    self.api.session().user()?.ok_or(Error::Auth)
  }

  // Professionals ---------------------------------------------------------

  /// Search professionals with caching.
  pub async fn search_professionals(
    &self,
    filter: &ProfessionalFilter,
  ) -> Result<Vec<Professional>> {
    let key = ApiQueryKey::ProfessionalSearch {
      filter: filter.clone(),
    };

    self
      .cache
      .fetch(&key, || {
        let api = self.api.clone();
        let params = filter.normalized_params();
        async move { api.get_paged("professionals", &params).await }
      })
      .await
  }

  /// Get a single professional by id with caching.
  pub async fn get_professional(&self, id: &str) -> Result<Professional> {
    let key = ApiQueryKey::ProfessionalDetail { id: id.to_string() };

    self
      .cache
      .fetch(&key, || {
        let api = self.api.clone();
        let path = format!("professionals/{}", id);
        async move { api.get_json(&path, &[]).await }
      })
      .await
  }

  /// Cleanup hook for a detail view leaving the screen; applies the
  /// configured release policy to the professional's cache entry.
  pub fn release_professional(&self, id: &str) -> Result<()> {
    self.cache.release(&ApiQueryKey::ProfessionalDetail { id: id.to_string() })
  }

  // Scheduling ------------------------------------------------------------

  /// List the signed-in client's appointments with caching.
  pub async fn list_appointments(
    &self,
    status: Option<AppointmentStatus>,
  ) -> Result<Vec<Appointment>> {
    let client_id = self.signed_in_user()?.id;
    let key = ApiQueryKey::Appointments {
      client_id: client_id.clone(),
      status,
    };

    self
      .cache
      .fetch(&key, || {
        let api = self.api.clone();
        let mut params = vec![("client_id".to_string(), client_id.clone())];
        if let Some(status) = status {
          params.push(("status".to_string(), status.as_str().to_string()));
        }
        async move { api.get_paged("appointments", &params).await }
      })
      .await
  }

  /// Book an appointment. On success the client's appointment queries are
  /// invalidated so the next listing refetches.
  pub async fn book_appointment(&self, new: &NewAppointment) -> Result<Appointment> {
    let client_id = self.signed_in_user()?.id;
    let mutation =
      Mutation::new(Operation::Create).invalidates_all(appointment_keys(&client_id));

    self
      .cache
      .mutate(mutation, || {
        let api = self.api.clone();
        let body = new.clone();
        async move { api.post_json("appointments", &body).await }
      })
      .await
  }

  /// Cancel an appointment. Invalidates the client's appointment queries
  /// on success.
  pub async fn cancel_appointment(&self, id: &str) -> Result<()> {
    let client_id = self.signed_in_user()?.id;
    let mutation =
      Mutation::new(Operation::Delete).invalidates_all(appointment_keys(&client_id));

    self
      .cache
      .mutate(mutation, || {
        let api = self.api.clone();
        let path = format!("appointments/{}", id);
        async move { api.delete(&path).await }
      })
      .await
  }

  // Reviews ---------------------------------------------------------------

  /// List reviews for a professional with caching.
  pub async fn list_reviews(&self, professional_id: &str) -> Result<Vec<Review>> {
    let key = ApiQueryKey::Reviews {
      professional_id: professional_id.to_string(),
    };

    self
      .cache
      .fetch(&key, || {
        let api = self.api.clone();
        let params = vec![("professional_id".to_string(), professional_id.to_string())];
        async move { api.get_paged("reviews", &params).await }
      })
      .await
  }

  /// Submit a review. Invalidates the professional's reviews and detail
  /// entry, whose rating aggregates change.
  pub async fn submit_review(&self, new: &NewReview) -> Result<Review> {
    let mutation = Mutation::new(Operation::Create)
      .invalidates(ApiQueryKey::Reviews {
        professional_id: new.professional_id.clone(),
      })
      .invalidates(ApiQueryKey::ProfessionalDetail {
        id: new.professional_id.clone(),
      });

    self
      .cache
      .mutate(mutation, || {
        let api = self.api.clone();
        let body = new.clone();
        async move { api.post_json("reviews", &body).await }
      })
      .await
  }

  // Profile ---------------------------------------------------------------

  /// Fetch the signed-in user's profile with caching.
  pub async fn get_profile(&self) -> Result<User> {
    let user_id = self.signed_in_user()?.id;
    let key = ApiQueryKey::Profile { user_id };

    self
      .cache
      .fetch(&key, || {
        let api = self.api.clone();
        async move { api.get_json("profile", &[]).await }
      })
      .await
  }

  /// Update the signed-in user's profile; the persisted user record is
  /// refreshed from the response.
  pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
    let user_id = self.signed_in_user()?.id;
    let mutation = Mutation::new(Operation::Update).invalidates(ApiQueryKey::Profile { user_id });

    let user: User = self
      .cache
      .mutate(mutation, || {
        let api = self.api.clone();
        let body = update.clone();
        async move { api.put_json("profile", &body).await }
      })
      .await?;

    self.api.session().set_user(&user)?;
    Ok(user)
  }
}

/// Every appointment query key a booking change can outdate: the unfiltered
/// listing plus each status-filtered variant.
fn appointment_keys(client_id: &str) -> Vec<ApiQueryKey> {
  let mut keys = vec![ApiQueryKey::Appointments {
    client_id: client_id.to_string(),
    status: None,
  }];
  for status in AppointmentStatus::ALL {
    keys.push(ApiQueryKey::Appointments {
      client_id: client_id.to_string(),
      status: Some(status),
    });
  }
  keys
}
