//! End-to-end flows for the marketplace client against a mock backend.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cuide_client::api::types::{
  Appointment, AppointmentStatus, NewAppointment, NewReview, Professional, ProfessionalFilter,
  Review, User,
};
use cuide_client::api::ApiClient;
use cuide_client::cache::MemoryStore;
use cuide_client::session::MemorySession;
use cuide_client::{Config, CredentialStore, Error, MarketplaceClient, QueryCache};

fn professional(id: &str) -> Professional {
  Professional {
    id: id.to_string(),
    name: "Maria".to_string(),
    specialty: "manicure".to_string(),
    city: "recife".to_string(),
    rating: 4.8,
    review_count: 12,
    price_cents: Some(8000),
    bio: None,
  }
}

fn appointment(id: &str) -> Appointment {
  Appointment {
    id: id.to_string(),
    professional_id: "p1".to_string(),
    client_id: "u1".to_string(),
    service: "manicure".to_string(),
    scheduled_for: Utc.with_ymd_and_hms(2026, 9, 15, 14, 0, 0).unwrap(),
    status: AppointmentStatus::Pending,
  }
}

fn page_json<T: serde::Serialize>(items: &[T]) -> serde_json::Value {
  serde_json::json!({ "items": items, "total": items.len() })
}

async fn signed_in_client(
  server: &MockServer,
) -> MarketplaceClient<MemoryStore, MemorySession> {
  let session = Arc::new(MemorySession::new());
  session.set_token("tok-123").unwrap();
  session
    .set_user(&User {
      id: "u1".to_string(),
      name: "Ana".to_string(),
      email: "ana@example.com".to_string(),
      phone: None,
    })
    .unwrap();

  let config = Config::for_base_url(server.uri());
  let api = ApiClient::new(&config, session).unwrap();
  MarketplaceClient::from_parts(api, QueryCache::in_memory())
}

#[tokio::test]
async fn test_login_persists_token_and_user() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/auth/login"))
    .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
      "token": "tok-456",
      "user": { "id": "u2", "name": "Bia", "email": "bia@example.com" }
    })))
    .expect(1)
    .mount(&server)
    .await;

  let session = Arc::new(MemorySession::new());
  let config = Config::for_base_url(server.uri());
  let api = ApiClient::new(&config, Arc::clone(&session)).unwrap();
  let client = MarketplaceClient::from_parts(api, QueryCache::in_memory());

  let user = client.login("bia@example.com", "secret1").await.unwrap();

  assert_eq!(user.id, "u2");
  assert_eq!(session.token().unwrap(), Some("tok-456".to_string()));
  assert_eq!(session.user().unwrap().map(|u| u.id), Some("u2".to_string()));
}

#[tokio::test]
async fn test_search_is_served_from_cache_within_staleness_window() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/professionals"))
    .and(query_param("specialty", "manicure"))
    .and(header("authorization", "Bearer tok-123"))
    .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[professional("p1")])))
    .expect(1)
    .mount(&server)
    .await;

  let client = signed_in_client(&server).await;
  let filter = ProfessionalFilter {
    specialty: Some("Manicure".to_string()),
    ..Default::default()
  };

  let first = client.search_professionals(&filter).await.unwrap();
  // Equivalent filter spelled differently must hit the same cache entry
  let second = client
    .search_professionals(&ProfessionalFilter {
      specialty: Some("  manicure ".to_string()),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(first, second);
  assert_eq!(first[0].id, "p1");
}

#[tokio::test]
async fn test_booking_invalidates_appointment_listings() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/appointments"))
    .and(query_param("client_id", "u1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[appointment("a1")])))
    .expect(2)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/appointments"))
    .respond_with(ResponseTemplate::new(201).set_body_json(appointment("a2")))
    .expect(1)
    .mount(&server)
    .await;

  let client = signed_in_client(&server).await;

  // Two reads, one network call: the second is a cache hit
  client.list_appointments(None).await.unwrap();
  client.list_appointments(None).await.unwrap();

  let booked = client
    .book_appointment(&NewAppointment {
      professional_id: "p1".to_string(),
      service: "manicure".to_string(),
      scheduled_for: Utc.with_ymd_and_hms(2026, 9, 20, 10, 0, 0).unwrap(),
    })
    .await
    .unwrap();
  assert_eq!(booked.id, "a2");

  // The listing was invalidated, so this read refetches (second network call)
  client.list_appointments(None).await.unwrap();
}

#[tokio::test]
async fn test_failed_booking_leaves_cache_untouched() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/appointments"))
    .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[appointment("a1")])))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/appointments"))
    .respond_with(ResponseTemplate::new(500))
    .expect(1)
    .mount(&server)
    .await;

  let client = signed_in_client(&server).await;

  client.list_appointments(None).await.unwrap();

  let result = client
    .book_appointment(&NewAppointment {
      professional_id: "p1".to_string(),
      service: "manicure".to_string(),
      scheduled_for: Utc.with_ymd_and_hms(2026, 9, 20, 10, 0, 0).unwrap(),
    })
    .await;
  assert!(matches!(result, Err(Error::Network(_))));

  // Still a cache hit: the declared keys were not invalidated on failure
  client.list_appointments(None).await.unwrap();
}

#[tokio::test]
async fn test_review_submission_refreshes_professional_detail() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/professionals/p1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(professional("p1")))
    .expect(2)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/reviews"))
    .respond_with(ResponseTemplate::new(201).set_body_json(Review {
      id: "r1".to_string(),
      professional_id: "p1".to_string(),
      author_id: "u1".to_string(),
      rating: 5,
      comment: "excellent".to_string(),
      created_at: Utc::now(),
    }))
    .expect(1)
    .mount(&server)
    .await;

  let client = signed_in_client(&server).await;

  client.get_professional("p1").await.unwrap();
  client.get_professional("p1").await.unwrap(); // cache hit

  client
    .submit_review(&NewReview {
      professional_id: "p1".to_string(),
      rating: 5,
      comment: "excellent".to_string(),
    })
    .await
    .unwrap();

  // Detail entry was invalidated along with the reviews
  client.get_professional("p1").await.unwrap();
}

#[tokio::test]
async fn test_forced_logout_on_expired_token() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/appointments"))
    .respond_with(ResponseTemplate::new(401))
    .mount(&server)
    .await;

  let client = signed_in_client(&server).await;

  let result = client.list_appointments(None).await;
  assert_eq!(result, Err(Error::Auth));

  // Credentials are gone; the next call fails locally as signed-out
  assert_eq!(client.session().token().unwrap(), None);
  let result = client.list_appointments(None).await;
  assert_eq!(result, Err(Error::Auth));
}

#[tokio::test]
async fn test_logout_clears_session_and_cache() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/professionals/p1"))
    .respond_with(ResponseTemplate::new(200).set_body_json(professional("p1")))
    .expect(2)
    .mount(&server)
    .await;

  let client = signed_in_client(&server).await;

  client.get_professional("p1").await.unwrap();
  client.logout().await.unwrap();
  assert_eq!(client.session().token().unwrap(), None);

  // Cache was cleared, so the read goes back to the network
  client.get_professional("p1").await.unwrap();
}
