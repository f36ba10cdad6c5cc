//! User profile and the request shapes that create or change it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in user, as returned by the account endpoints.
///
/// `role` and `is_admin` are server-issued claims; [`UserProfile::is_admin`]
/// trusts nothing else. Any privileged request is still re-validated
/// server-side, so these flags only gate what the console offers to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend-issued identifier (opaque string).
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// First and last name joined for display.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }

    /// Whether the server granted this user the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin || self.role.as_deref() == Some("admin")
    }
}

/// Registration payload for `POST /users/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Partial profile update for `PUT /users/{id}`.
///
/// Absent fields are omitted from the request body and left untouched by the
/// backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ProfileUpdate {
    /// True when no field is set (nothing to send).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: "u-1".to_owned(),
            first_name: "Amina".to_owned(),
            last_name: "Okafor".to_owned(),
            email: "amina@example.com".to_owned(),
            phone: None,
            address: None,
            role: None,
            is_admin: false,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(profile().full_name(), "Amina Okafor");
    }

    #[test]
    fn test_full_name_trims_missing_parts() {
        let mut p = profile();
        p.last_name = String::new();
        assert_eq!(p.full_name(), "Amina");
    }

    #[test]
    fn test_is_admin_from_role_claim() {
        let mut p = profile();
        p.role = Some("admin".to_owned());
        assert!(p.is_admin());
    }

    #[test]
    fn test_is_admin_from_flag_claim() {
        let mut p = profile();
        p.is_admin = true;
        assert!(p.is_admin());
    }

    #[test]
    fn test_is_admin_requires_server_claim() {
        // An email alone grants nothing, whatever it happens to be.
        let mut p = profile();
        p.email = "owner@sokoni.store".to_owned();
        assert!(!p.is_admin());

        p.role = Some("customer".to_owned());
        assert!(!p.is_admin());
    }

    #[test]
    fn test_profile_update_skips_absent_fields() {
        let update = ProfileUpdate {
            phone: Some("+254700000000".to_owned()),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"phone":"+254700000000"}"#);
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_deserialize_without_claims() {
        let json = r#"{
            "id": "u-9",
            "first_name": "Joy",
            "last_name": "Mwangi",
            "email": "joy@example.com",
            "phone": "+254711111111",
            "address": "Nairobi"
        }"#;
        let p: UserProfile = serde_json::from_str(json).unwrap();
        assert!(!p.is_admin());
        assert_eq!(p.phone.as_deref(), Some("+254711111111"));
    }
}
