//! Query keys for marketplace API calls.

use sha2::{Digest, Sha256};

use crate::cache::QueryKey;

use super::types::{AppointmentStatus, ProfessionalFilter};

/// Query key types for the marketplace endpoints.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiQueryKey {
  /// Search professionals with filters
  ProfessionalSearch { filter: ProfessionalFilter },
  /// Get a single professional by id
  ProfessionalDetail { id: String },
  /// A client's appointments, optionally filtered by status
  Appointments {
    client_id: String,
    status: Option<AppointmentStatus>,
  },
  /// Reviews for a professional
  Reviews { professional_id: String },
  /// The signed-in user's profile
  Profile { user_id: String },
}

impl QueryKey for ApiQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::ProfessionalSearch { filter } => {
        let params: Vec<String> = filter
          .normalized_params()
          .into_iter()
          .map(|(name, value)| format!("{}={}", name, value))
          .collect();
        format!("professional_search:{}", params.join("&"))
      }
      Self::ProfessionalDetail { id } => format!("professional_detail:{}", id),
      Self::Appointments { client_id, status } => format!(
        "appointments:{}:{}",
        client_id,
        status.map(|s| s.as_str()).unwrap_or("")
      ),
      Self::Reviews { professional_id } => format!("reviews:{}", professional_id),
      Self::Profile { user_id } => format!("profile:{}", user_id),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::ProfessionalSearch { filter } => {
        let params = filter.normalized_params();
        if params.is_empty() {
          "all professionals".to_string()
        } else {
          let rendered: Vec<String> =
            params.into_iter().map(|(name, value)| format!("{}={}", name, value)).collect();
          format!("professionals: {}", rendered.join(", "))
        }
      }
      Self::ProfessionalDetail { id } => format!("professional {}", id),
      Self::Appointments { client_id, status } => match status {
        Some(status) => format!("appointments for {} ({})", client_id, status.as_str()),
        None => format!("appointments for {}", client_id),
      },
      Self::Reviews { professional_id } => format!("reviews for {}", professional_id),
      Self::Profile { user_id } => format!("profile {}", user_id),
    }
  }
}
