use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{
    PROFILE_LANGUAGES, REGISTRATION_LANGUAGES, ensure_language, ensure_length, normalize_email,
};
use crate::error::{OmniError, Result};

/// Member role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    /// Reviews mission photos, manages partner stores, looks up members in store
    Admin,
}

/// Social login provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Google,
    Facebook,
    Kakao,
}

impl AuthProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Facebook => "Facebook",
            Self::Kakao => "Kakao",
        }
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = OmniError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            "kakao" => Ok(Self::Kakao),
            other => Err(OmniError::not_found(format!(
                "Unsupported login provider '{other}'"
            ))),
        }
    }
}

/// Member account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// `None` for accounts created through a social login
    pub password_hash: Option<String>,
    pub name: String,
    pub country: String,
    pub phone: Option<String>,
    pub preferred_language: String,
    pub customer_id: String,
    pub passport_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub nationality: Option<String>,
    pub passport_expiry: Option<String>,
    pub provider: Option<AuthProvider>,
    pub provider_id: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub country: String,
    pub phone: Option<String>,
    pub preferred_language: Option<String>,
}

impl RegisterRequest {
    /// Validates the payload and returns the normalised email.
    pub fn validate(&self) -> Result<String> {
        let email = normalize_email(&self.email)?;
        if self.password.chars().count() < 8 {
            return Err(OmniError::validation(
                "password must be at least 8 characters",
            ));
        }
        ensure_length("name", &self.name, 1, 100)?;
        ensure_length("country", &self.country, 2, 100)?;
        if let Some(language) = self.preferred_language.as_deref() {
            ensure_language(language, REGISTRATION_LANGUAGES)?;
        }
        Ok(email)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub country: Option<String>,
    pub nationality: Option<String>,
    pub phone: Option<String>,
    pub passport_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub passport_expiry: Option<String>,
}

impl ProfileUpdateRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self.name.as_deref() {
            ensure_length("name", name, 1, 100)?;
        }
        if let Some(country) = self.country.as_deref() {
            ensure_length("country", country, 2, 100)?;
        }
        if let Some(nationality) = self.nationality.as_deref() {
            ensure_length("nationality", nationality, 0, 100)?;
        }
        Ok(())
    }

    /// Applies only the provided fields.
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name.trim().to_string();
        }
        if let Some(country) = self.country {
            user.country = country.trim().to_string();
        }
        if self.nationality.is_some() {
            user.nationality = self.nationality;
        }
        if self.phone.is_some() {
            user.phone = self.phone;
        }
        if self.passport_number.is_some() {
            user.passport_number = self.passport_number;
        }
        if self.date_of_birth.is_some() {
            user.date_of_birth = self.date_of_birth;
        }
        if self.passport_expiry.is_some() {
            user.passport_expiry = self.passport_expiry;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageUpdateRequest {
    pub preferred_language: String,
}

impl LanguageUpdateRequest {
    pub fn validate(&self) -> Result<()> {
        ensure_language(&self.preferred_language, PROFILE_LANGUAGES)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub country: String,
    pub phone: Option<String>,
    pub preferred_language: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            country: user.country.clone(),
            phone: user.phone.clone(),
            preferred_language: user.preferred_language.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfileResponse {
    pub id: Uuid,
    pub customer_id: String,
    pub email: String,
    pub name: String,
    pub country: String,
    pub nationality: Option<String>,
    pub phone: Option<String>,
    pub preferred_language: String,
    pub passport_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub passport_expiry: Option<String>,
    pub provider: Option<AuthProvider>,
    pub profile_picture: Option<String>,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            customer_id: user.customer_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            country: user.country.clone(),
            nationality: user.nationality.clone(),
            phone: user.phone.clone(),
            preferred_language: user.preferred_language.clone(),
            passport_number: user.passport_number.clone(),
            date_of_birth: user.date_of_birth.clone(),
            passport_expiry: user.passport_expiry.clone(),
            provider: user.provider,
            profile_picture: user.profile_picture.clone(),
            role: user.role,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// Membership code shown as QR and barcode at partner counters
#[derive(Debug, Serialize)]
pub struct MemberCodeResponse {
    pub customer_id: String,
    pub name: String,
    pub points_balance: i64,
    pub qr_payload: String,
    pub barcode_value: String,
}

#[derive(Debug, Serialize)]
pub struct MemberLookupResponse {
    pub user_id: Uuid,
    pub customer_id: String,
    pub name: String,
    pub country: String,
    pub points_balance: i64,
}
