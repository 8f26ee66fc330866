//! Member accounts: registration, credentials, profile and social login

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::customer_code;
use super::oauth::VerifiedIdentity;
use crate::auth::{hash_password_with_cost, verify_password};
use crate::config::AppConfig;
use crate::error::{OmniError, Result};
use crate::models::user::{
    LanguageUpdateRequest, LoginRequest, MemberCodeResponse, MemberLookupResponse,
    ProfileUpdateRequest, RegisterRequest,
};
use crate::models::{PointBalance, Role, User};
use crate::storage::Database;

const DEFAULT_LANGUAGE: &str = "en";
const UNKNOWN_COUNTRY: &str = "Unknown";

fn role_for(config: &AppConfig, email: &str) -> Role {
    if config.is_admin_email(email) {
        Role::Admin
    } else {
        Role::Member
    }
}

/// bcrypt is CPU bound; keep it off the async workers
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OmniError::internal(format!("Password task failed: {}", e)))
}

pub async fn register(db: &Database, config: &AppConfig, request: RegisterRequest) -> Result<User> {
    let email = request.validate()?;

    if db.read(|tables| tables.user_by_email(&email).is_some())? {
        return Err(OmniError::conflict("Email already registered"));
    }

    let password = request.password.clone();
    let cost = config.bcrypt_cost;
    let password_hash = blocking(move || hash_password_with_cost(&password, cost)).await??;

    let role = role_for(config, &email);
    let user = db.transact(|tx| {
        // Re-checked under the write lock; another request may have won the race
        if tx.tables().user_by_email(&email).is_some() {
            return Err(OmniError::conflict("Email already registered"));
        }

        let now = Utc::now();
        let country = request.country.trim().to_string();
        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash: Some(password_hash),
            name: request.name.trim().to_string(),
            customer_id: customer_code::allocate(tx.tables(), &country)?,
            country,
            phone: request.phone.clone(),
            preferred_language: request
                .preferred_language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            passport_number: None,
            date_of_birth: None,
            nationality: None,
            passport_expiry: None,
            provider: None,
            provider_id: None,
            profile_picture: None,
            role,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        tx.put(user.clone());
        tx.put(PointBalance::empty(user.id, now));
        Ok(user)
    })?;

    info!(user_id = %user.id, customer_id = %user.customer_id, "member registered");
    Ok(user)
}

/// Checks credentials and stamps `last_login`.
///
/// Unknown email, wrong password and social-only accounts all fail with the
/// same message.
pub async fn login(db: &Database, config: &AppConfig, request: LoginRequest) -> Result<User> {
    let rejected = || OmniError::unauthorized("Incorrect email or password");
    let email = request.email.trim().to_ascii_lowercase();

    let account = db
        .read(|tables| tables.user_by_email(&email).cloned())?
        .ok_or_else(rejected)?;
    let hash = account.password_hash.clone().ok_or_else(rejected)?;

    let password = request.password;
    if !blocking(move || verify_password(&password, &hash)).await? {
        return Err(rejected());
    }

    let promote = config.is_admin_email(&email);
    let user = db.transact(|tx| {
        let mut user = tx
            .tables()
            .user(account.id)
            .cloned()
            .ok_or_else(rejected)?;
        user.last_login = Some(Utc::now());
        if promote {
            user.role = Role::Admin;
        }
        tx.put(user.clone());
        Ok(user)
    })?;

    info!(user_id = %user.id, "member logged in");
    Ok(user)
}

/// Finds or creates the account behind a verified social identity.
pub fn login_with_identity(
    db: &Database,
    config: &AppConfig,
    identity: VerifiedIdentity,
) -> Result<User> {
    let provider = identity.provider;
    let email = identity
        .email
        .as_deref()
        .map(|email| email.trim().to_ascii_lowercase())
        .filter(|email| !email.is_empty())
        .ok_or_else(|| {
            OmniError::bad_request(format!(
                "Email not provided by {}",
                provider.display_name()
            ))
        })?;

    let role = role_for(config, &email);
    let (user, created) = db.transact(|tx| {
        let now = Utc::now();
        if let Some(existing) = tx.tables().user_by_email(&email) {
            let mut user = existing.clone();
            user.provider = Some(provider);
            user.provider_id = identity.provider_id.clone();
            user.profile_picture = identity.picture.clone();
            user.last_login = Some(now);
            if role == Role::Admin {
                user.role = Role::Admin;
            }
            user.updated_at = now;
            tx.put(user.clone());
            return Ok((user, false));
        }

        let name = match identity.name.trim() {
            "" => email.split('@').next().unwrap_or_default().to_string(),
            name => name.to_string(),
        };
        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash: None,
            name,
            country: UNKNOWN_COUNTRY.to_string(),
            phone: None,
            preferred_language: DEFAULT_LANGUAGE.to_string(),
            customer_id: customer_code::allocate(tx.tables(), UNKNOWN_COUNTRY)?,
            passport_number: None,
            date_of_birth: None,
            nationality: None,
            passport_expiry: None,
            provider: Some(provider),
            provider_id: identity.provider_id.clone(),
            profile_picture: identity.picture.clone(),
            role,
            last_login: Some(now),
            created_at: now,
            updated_at: now,
        };
        tx.put(user.clone());
        tx.put(PointBalance::empty(user.id, now));
        Ok((user, true))
    })?;

    info!(
        user_id = %user.id,
        provider = provider.display_name(),
        created,
        "social login"
    );
    Ok(user)
}

pub fn update_profile(db: &Database, user_id: Uuid, update: ProfileUpdateRequest) -> Result<User> {
    update.validate()?;

    db.transact(|tx| {
        let mut user = tx
            .tables()
            .user(user_id)
            .cloned()
            .ok_or_else(|| OmniError::not_found("User not found"))?;
        update.apply(&mut user);
        user.updated_at = Utc::now();
        tx.put(user.clone());
        Ok(user)
    })
}

pub fn update_language(
    db: &Database,
    user_id: Uuid,
    request: &LanguageUpdateRequest,
) -> Result<User> {
    request.validate()?;

    db.transact(|tx| {
        let mut user = tx
            .tables()
            .user(user_id)
            .cloned()
            .ok_or_else(|| OmniError::not_found("User not found"))?;
        user.preferred_language = request.preferred_language.clone();
        user.updated_at = Utc::now();
        tx.put(user.clone());
        Ok(user)
    })
}

pub fn member_code(db: &Database, user: &User) -> Result<MemberCodeResponse> {
    let balance = db.read(|tables| tables.balance_of(user.id))?;
    Ok(customer_code::member_code(user, balance, Utc::now()))
}

/// In-store lookup by the code printed on the member card
pub fn lookup_member(db: &Database, customer_id: &str) -> Result<MemberLookupResponse> {
    let customer_id = customer_id.trim().to_ascii_uppercase();
    db.read(|tables| {
        tables
            .user_by_customer_id(&customer_id)
            .map(|user| MemberLookupResponse {
                user_id: user.id,
                customer_id: user.customer_id.clone(),
                name: user.name.clone(),
                country: user.country.clone(),
                points_balance: tables.balance_of(user.id),
            })
    })?
    .ok_or_else(|| OmniError::not_found("Member not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthProvider;

    fn config() -> AppConfig {
        AppConfig::default()
            .bcrypt_cost(4)
            .admin_email("ops@omnipass.kr")
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "seoul-nights".to_string(),
            name: "Aiko Tanaka".to_string(),
            country: "Japan".to_string(),
            phone: None,
            preferred_language: Some("ja".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let db = Database::in_memory();
        let config = config();

        let user = register(&db, &config, registration(" Aiko@Example.com ")).await.unwrap();
        assert_eq!(user.email, "aiko@example.com");
        assert!(user.customer_id.starts_with("OMP-JAP-"));
        assert_eq!(user.role, Role::Member);
        assert_eq!(db.read(|t| t.balances[&user.id].balance).unwrap(), 0);

        let duplicate = register(&db, &config, registration("aiko@example.com")).await;
        assert!(matches!(duplicate, Err(OmniError::Conflict(_))));

        let logged_in = login(
            &db,
            &config,
            LoginRequest {
                email: "AIKO@example.com".to_string(),
                password: "seoul-nights".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(logged_in.last_login.is_some());

        let wrong = login(
            &db,
            &config,
            LoginRequest {
                email: "aiko@example.com".to_string(),
                password: "wrong-password".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(wrong.to_string(), "Incorrect email or password");
    }

    #[tokio::test]
    async fn test_admin_email_gets_admin_role() {
        let db = Database::in_memory();
        let user = register(&db, &config(), registration("ops@omnipass.kr")).await.unwrap();
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn test_social_login_links_existing_account() {
        let db = Database::in_memory();
        let config = config();
        let existing = register(&db, &config, registration("aiko@example.com")).await.unwrap();

        let identity = VerifiedIdentity {
            provider: AuthProvider::Google,
            provider_id: Some("g-1".to_string()),
            email: Some("Aiko@Example.com".to_string()),
            name: "Aiko".to_string(),
            picture: Some("https://lh3.googleusercontent.com/a.png".to_string()),
        };
        let linked = login_with_identity(&db, &config, identity).unwrap();
        assert_eq!(linked.id, existing.id);
        assert_eq!(linked.provider, Some(AuthProvider::Google));
        assert!(linked.password_hash.is_some());
    }

    #[test]
    fn test_social_login_creates_account() {
        let db = Database::in_memory();
        let identity = VerifiedIdentity {
            provider: AuthProvider::Kakao,
            provider_id: Some("42".to_string()),
            email: Some("minsu@kakao.com".to_string()),
            name: String::new(),
            picture: None,
        };
        let user = login_with_identity(&db, &config(), identity.clone()).unwrap();
        assert_eq!(user.country, "Unknown");
        assert_eq!(user.name, "minsu");
        assert!(user.customer_id.starts_with("OMP-TEMP-"));
        assert!(user.password_hash.is_none());

        let no_email = VerifiedIdentity {
            email: None,
            ..identity
        };
        let err = login_with_identity(&db, &config(), no_email).unwrap_err();
        assert!(matches!(err, OmniError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_member_lookup() {
        let db = Database::in_memory();
        let user = register(&db, &config(), registration("aiko@example.com")).await.unwrap();

        let found = lookup_member(&db, &user.customer_id.to_ascii_lowercase()).unwrap();
        assert_eq!(found.user_id, user.id);
        assert!(matches!(
            lookup_member(&db, "OMP-XXX-0000-000"),
            Err(OmniError::NotFound(_))
        ));

        let code = member_code(&db, &user).unwrap();
        assert!(!code.barcode_value.contains('-'));
        let payload: serde_json::Value = serde_json::from_str(&code.qr_payload).unwrap();
        assert_eq!(payload["type"], "OMNIPASS_MEMBER");
        assert_eq!(payload["customerId"], user.customer_id);
    }
}
