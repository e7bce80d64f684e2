//! Authentication.
//!
//! `AuthService` abstracts the identity provider: sign-up, sign-in,
//! sign-out and observation of the current identity. `MemoryAuthService`
//! is the in-process implementation.

use async_trait::async_trait;
use tokio::sync::watch;

mod memory;

pub use memory::MemoryAuthService;

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl Identity {
    /// Name stamped on records this user authors.
    pub fn label(&self) -> String {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(Some(self.email.as_str()).filter(|email| !email.is_empty()))
            .unwrap_or("User")
            .to_string()
    }
}

/// Errors from the auth service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("No account for {email}")]
    UserNotFound { email: String },

    #[error("Wrong password for {email}")]
    WrongPassword { email: String },

    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },

    #[error("Too many failed sign-in attempts for {email}")]
    TooManyRequests { email: String },

    #[error("Email already in use: {email}")]
    EmailAlreadyInUse { email: String },

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("Auth backend error: {0}")]
    Backend(String),
}

impl AuthError {
    /// Message suitable for showing to the person signing in.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::UserNotFound { .. } => {
                "No account found with this email. Please sign up first.".to_string()
            }
            AuthError::WrongPassword { .. } => "Incorrect password. Please try again.".to_string(),
            AuthError::InvalidEmail { .. } => "Please enter a valid email address.".to_string(),
            AuthError::TooManyRequests { .. } => {
                "Too many failed attempts. Please try again later.".to_string()
            }
            AuthError::EmailAlreadyInUse { .. } => {
                "An account with this email already exists.".to_string()
            }
            AuthError::WeakPassword { min } => {
                format!("Password should be at least {} characters.", min)
            }
            AuthError::Backend(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Identity provider.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and sign it in.
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;

    async fn sign_out(&self) -> Result<()>;

    /// Currently signed-in identity.
    fn current(&self) -> Option<Identity>;

    /// Observe sign-in and sign-out.
    fn observe(&self) -> watch::Receiver<Option<Identity>>;
}
