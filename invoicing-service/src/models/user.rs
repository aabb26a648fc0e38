//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered account. The business identity fields prefill `billingFrom`
/// on new invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string; never serialized into responses.
    pub password_hash: String,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub business_address: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            business_name: String::new(),
            business_address: String::new(),
            address: String::new(),
            phone: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    /// Apply a profile update; omitted fields are kept.
    pub fn apply_profile(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(business_name) = &update.business_name {
            self.business_name = business_name.clone();
        }
        if let Some(business_address) = &update.business_address {
            self.business_address = business_address.clone();
        }
        if let Some(address) = &update.address {
            self.address = address.clone();
        }
        if let Some(phone) = &update.phone {
            self.phone = phone.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Partial profile update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub business_address: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Caller identity resolved from a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub email: String,
}
