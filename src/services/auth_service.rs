use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use std::sync::LazyLock;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{DbPool, SessionStore, UserStore},
    error::AppError,
    models::user::{Role, SessionInfo, SessionResponse, UserDto},
};

const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";
const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex pattern for email")
});

/// Signed-in identity attached to an authenticated request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Creator of a record, or an admin
    pub fn can_modify(&self, created_by: Uuid) -> bool {
        self.role == Role::Admin || self.user_id == created_by
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    sid: Uuid,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserStore,
    sessions: SessionStore,
    jwt_secret: String,
    expiration: Duration,
}

impl AuthService {
    pub fn new(pool: DbPool, jwt_secret: String, expiration_hours: i64) -> Self {
        Self {
            users: UserStore::new(pool.clone()),
            sessions: SessionStore::new(pool),
            jwt_secret,
            expiration: Duration::hours(expiration_hours),
        }
    }

    /// Create an account. The first account becomes an admin.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<UserDto, AuthError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        validate_password(password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let role = if self.users.count_users().await? == 0 {
            Role::Admin
        } else {
            Role::User
        };
        let hash = hash_password(password)?;
        let user = self.users.create_user(&email, &hash, role).await?;

        tracing::info!("Created account {} with role {:?}", user.id, user.role);
        Ok(UserDto::from(user))
    }

    /// Verify credentials and open a session
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionResponse, AuthError> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !verify_password(password, &user.password_hash) {
            tracing::warn!("Failed sign-in for account {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let session = self
            .sessions
            .create(user.id, Utc::now() + self.expiration)
            .await?;

        let claims = Claims {
            sub: user.id,
            sid: session.id,
            iat: session.created_at.timestamp(),
            exp: session.expires_at.timestamp(),
        };
        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        tracing::info!("Account {} signed in, session {}", user.id, session.id);
        Ok(SessionResponse {
            access_token,
            token_type: "bearer".to_string(),
            session_id: session.id,
            expires_at: session.expires_at,
            user: UserDto::from(user),
        })
    }

    pub async fn sign_out(&self, user: &AuthUser) -> Result<(), AuthError> {
        self.sessions.revoke(user.session_id).await?;
        tracing::info!("Session {} signed out", user.session_id);
        Ok(())
    }

    /// Resolve a bearer token to the signed-in identity
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?
        .claims;

        let session = self
            .sessions
            .get_active(claims.sid)
            .await?
            .filter(|s| s.user_id == claims.sub)
            .ok_or(AuthError::SessionExpired)?;

        let user = self.users.get_user_by_id(session.user_id).await?;
        Ok(AuthUser {
            user_id: user.id,
            session_id: session.id,
            email: user.email,
            role: user.role,
        })
    }

    pub async fn session_info(&self, user: &AuthUser) -> Result<SessionInfo, AuthError> {
        let session = self
            .sessions
            .get_active(user.session_id)
            .await?
            .ok_or(AuthError::SessionExpired)?;
        let account = self.users.get_user_by_id(user.user_id).await?;

        Ok(SessionInfo {
            session_id: session.id,
            expires_at: session.expires_at,
            user: UserDto::from(account),
        })
    }

    pub async fn current_user(&self, user: &AuthUser) -> Result<UserDto, AuthError> {
        Ok(UserDto::from(self.users.get_user_by_id(user.user_id).await?))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let rule = if password.chars().count() < MIN_PASSWORD_LEN {
        Some("Password must be at least 6 characters long")
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("Password must include at least one lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must include at least one uppercase letter")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must include at least one number")
    } else if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        Some("Password must include at least one symbol")
    } else {
        None
    };

    match rule {
        Some(message) => Err(AuthError::WeakPassword(message)),
        None => Ok(()),
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; 16];
    rand::rng().fill(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| AuthError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("{0}")]
    WeakPassword(&'static str),
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("No account found for this email")]
    AccountNotFound,
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Session expired or signed out")]
    SessionExpired,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail | AuthError::WeakPassword(_) => {
                AppError::Validation(err.to_string())
            }
            AuthError::EmailTaken => AppError::Conflict(err.to_string()),
            AuthError::AccountNotFound => AppError::AccountNotFound,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::SessionExpired => {
                AppError::Auth(err.to_string())
            }
            AuthError::Hashing(_) | AuthError::Token(_) => AppError::Internal(err.to_string()),
            AuthError::App(inner) => inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("officer@tn.gov"));
        assert!(!is_valid_email("officer@tn"));
        assert!(!is_valid_email("off icer@tn.gov"));
        assert!(!is_valid_email("@tn.gov"));
        assert!(!is_valid_email("officer@@tn.gov"));
        assert!(is_valid_email("x@a.b."));
        assert!(is_valid_email("officer@dot.tn.gov"));
    }

    #[test]
    fn password_rules_report_the_first_failure() {
        let message = |pw: &str| validate_password(pw).unwrap_err().to_string();
        assert_eq!(message("Ab1!"), "Password must be at least 6 characters long");
        assert_eq!(message("ABCDEF1!"), "Password must include at least one lowercase letter");
        assert_eq!(message("abcdef1!"), "Password must include at least one uppercase letter");
        assert_eq!(message("Abcdefg!"), "Password must include at least one number");
        assert_eq!(message("Abcdef12"), "Password must include at least one symbol");
        assert!(validate_password("Abcdef1!").is_ok());
    }

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("Abcdef1!").unwrap();
        assert!(verify_password("Abcdef1!", &hash));
        assert!(!verify_password("Abcdef1?", &hash));
        assert!(!verify_password("Abcdef1!", "not-a-hash"));
    }
}
