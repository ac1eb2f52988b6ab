//! Domain types exchanged with the Cuide-Se backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed-in client account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub phone: Option<String>,
}

/// A beauty/wellness professional as shown in search and detail views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
  pub id: String,
  pub name: String,
  pub specialty: String,
  pub city: String,
  pub rating: f64,
  pub review_count: u32,
  #[serde(default)]
  pub price_cents: Option<u64>,
  #[serde(default)]
  pub bio: Option<String>,
}

/// Search filters for professionals. All fields optional; an empty filter
/// lists everyone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalFilter {
  pub specialty: Option<String>,
  pub city: Option<String>,
  pub min_rating: Option<f64>,
  pub max_price_cents: Option<u64>,
}

impl ProfessionalFilter {
  /// Filter parameters as (name, value) pairs sorted by name, with text
  /// values trimmed and lowercased. Logically equivalent filters always
  /// produce the same sequence.
  pub fn normalized_params(&self) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Some(specialty) = &self.specialty {
      params.push(("specialty".to_string(), specialty.trim().to_lowercase()));
    }
    if let Some(city) = &self.city {
      params.push(("city".to_string(), city.trim().to_lowercase()));
    }
    if let Some(min_rating) = self.min_rating {
      params.push(("min_rating".to_string(), min_rating.to_string()));
    }
    if let Some(max_price) = self.max_price_cents {
      params.push(("max_price_cents".to_string(), max_price.to_string()));
    }
    params.sort();
    params
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
  Pending,
  Confirmed,
  Cancelled,
  Completed,
}

impl AppointmentStatus {
  pub const ALL: [AppointmentStatus; 4] = [
    AppointmentStatus::Pending,
    AppointmentStatus::Confirmed,
    AppointmentStatus::Cancelled,
    AppointmentStatus::Completed,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      AppointmentStatus::Pending => "pending",
      AppointmentStatus::Confirmed => "confirmed",
      AppointmentStatus::Cancelled => "cancelled",
      AppointmentStatus::Completed => "completed",
    }
  }
}

/// A booked appointment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
  pub id: String,
  pub professional_id: String,
  pub client_id: String,
  pub service: String,
  pub scheduled_for: DateTime<Utc>,
  pub status: AppointmentStatus,
}

/// Payload for booking a new appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
  pub professional_id: String,
  pub service: String,
  pub scheduled_for: DateTime<Utc>,
}

/// A review left by a client for a professional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
  pub id: String,
  pub professional_id: String,
  pub author_id: String,
  pub rating: u8,
  pub comment: String,
  pub created_at: DateTime<Utc>,
}

/// Payload for submitting a new review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
  pub professional_id: String,
  pub rating: u8,
  pub comment: String,
}

/// Profile fields a client may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
}

/// Response from the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
  pub token: String,
  pub user: User,
}
