//! In-process auth service with argon2 password hashes.

use std::collections::HashMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use super::{AuthError, AuthService, Identity, Result};
use crate::config::AuthConfig;


struct Account {
    uid: String,
    email: String,
    display_name: Option<String>,
    password_hash: String,
    failed_attempts: u32,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Auth service keeping accounts in memory.
///
/// Accounts are keyed by lower-cased email. After `max_failed_attempts`
/// consecutive wrong passwords an account rejects sign-in until a restart.
pub struct MemoryAuthService {
    accounts: RwLock<HashMap<String, Account>>,
    current: watch::Sender<Option<Identity>>,
    hasher: Argon2<'static>,
    min_password_length: usize,
    max_failed_attempts: u32,
}

impl MemoryAuthService {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let params = Params::new(config.hash_memory_kib, config.hash_iterations, 1, None)
            .map_err(|e| AuthError::Backend(format!("invalid hash parameters: {}", e)))?;
        let (current, _) = watch::channel(None);
        Ok(Self {
            accounts: RwLock::new(HashMap::new()),
            current,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            min_password_length: config.min_password_length,
            max_failed_attempts: config.max_failed_attempts,
        })
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::Backend(e.to_string()))?
    }

    async fn verify_password(&self, password: &str, password_hash: String) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed =
                PasswordHash::new(&password_hash).map_err(|e| AuthError::Backend(e.to_string()))?;
            Ok(hasher.verify_password(password.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|e| AuthError::Backend(e.to_string()))?
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail { email })
    }
}

#[async_trait]
impl AuthService for MemoryAuthService {
    #[tracing::instrument(name = "auth.sign_up", skip_all)]
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<Identity> {
        let email = normalize_email(email)?;
        if password.chars().count() < self.min_password_length {
            return Err(AuthError::WeakPassword {
                min: self.min_password_length,
            });
        }
        if self.accounts.read().await.contains_key(&email) {
            return Err(AuthError::EmailAlreadyInUse { email });
        }

        let password_hash = self.hash_password(password).await?;
        let display_name = Some(display_name.trim().to_string()).filter(|n| !n.is_empty());

        let identity = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailAlreadyInUse { email });
            }
            let account = Account {
                uid: Uuid::new_v4().simple().to_string(),
                email: email.clone(),
                display_name,
                password_hash,
                failed_attempts: 0,
            };
            let identity = account.identity();
            accounts.insert(email, account);
            identity
        };

        info!(uid = %identity.uid, "Account registered");
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    #[tracing::instrument(name = "auth.sign_in", skip_all)]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let email = normalize_email(email)?;

        let password_hash = {
            let accounts = self.accounts.read().await;
            let account = accounts
                .get(&email)
                .ok_or_else(|| AuthError::UserNotFound {
                    email: email.clone(),
                })?;
            if account.failed_attempts >= self.max_failed_attempts {
                warn!(uid = %account.uid, "Sign-in throttled");
                return Err(AuthError::TooManyRequests { email });
            }
            account.password_hash.clone()
        };

        let verified = self.verify_password(password, password_hash).await?;

        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&email)
            .ok_or_else(|| AuthError::UserNotFound {
                email: email.clone(),
            })?;
        if !verified {
            account.failed_attempts += 1;
            warn!(
                uid = %account.uid,
                failed_attempts = account.failed_attempts,
                "Sign-in rejected"
            );
            return Err(AuthError::WrongPassword { email });
        }

        account.failed_attempts = 0;
        let identity = account.identity();
        drop(accounts);

        info!(uid = %identity.uid, "Signed in");
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(identity) = self.current.send_replace(None) {
            info!(uid = %identity.uid, "Signed out");
        }
        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    fn observe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}
