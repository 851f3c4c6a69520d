use std::collections::HashMap;
use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use tracing::{info, warn};

use super::listeners::{Listeners, Subscription};
use super::principal::Identity;
use crate::error::{AppError, AppResult};

pub type SessionCallback = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// External authentication provider contract.
pub trait AuthProvider: Send + Sync {
    /// Register for session changes. The callback is invoked immediately with the
    /// current identity (or `None`), then once per change.
    fn subscribe(&self, callback: SessionCallback) -> Subscription;
    fn sign_out(&self) -> AppResult<()>;
}

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    identity: Identity,
    password_hash: String,
}

/// In-process provider with email/password accounts.
#[derive(Default)]
pub struct LocalAuthProvider {
    // keyed by lowercased email
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<Identity>>,
    listeners: Listeners<Option<Identity>>,
}

fn hash_password(password: &str) -> AppResult<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AppError::internal("salt_failed".to_string(), e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::internal("salt_failed".to_string(), e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::internal("hash_failed".to_string(), e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

fn invalid_credentials() -> AppError {
    AppError::auth("invalid_credentials", "Email or password is incorrect.")
}

impl LocalAuthProvider {
    pub fn new() -> Self { Self::default() }

    /// Create an account. Does not sign the new identity in.
    pub fn register(&self, email: &str, password: &str, display_name: &str) -> AppResult<Identity> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::user("invalid_email", "A valid email is required."));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::user("weak_password".to_string(), format!("Password must be at least {} characters.", MIN_PASSWORD_LEN)));
        }
        let key = email.to_lowercase();
        if self.accounts.read().contains_key(&key) {
            return Err(AppError::conflict("email_in_use", "An account with this email already exists."));
        }
        let password_hash = hash_password(password)?;
        let identity = Identity::new(uuid::Uuid::new_v4().simple().to_string(), email.to_string(), display_name.trim().to_string());
        let mut accounts = self.accounts.write();
        // re-check under the write lock; hashing ran unlocked
        if accounts.contains_key(&key) {
            return Err(AppError::conflict("email_in_use", "An account with this email already exists."));
        }
        accounts.insert(key, Account { identity: identity.clone(), password_hash });
        info!(target: "alumni_portal::auth", "auth.register id={} email={}", identity.id, identity.email);
        Ok(identity)
    }

    pub fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Identity> {
        let identity = {
            let accounts = self.accounts.read();
            let Some(acct) = accounts.get(&email.trim().to_lowercase()) else {
                return Err(invalid_credentials());
            };
            if !verify_password(&acct.password_hash, password) {
                return Err(invalid_credentials());
            }
            acct.identity.clone()
        };
        info!(target: "alumni_portal::auth", "auth.sign_in id={}", identity.id);
        self.set_current(Some(identity.clone()));
        Ok(identity)
    }

    /// Reinstate a persisted session without credentials (startup restore).
    pub fn restore(&self, identity: Identity) {
        self.set_current(Some(identity));
    }

    /// Session restore failed; subscribers see the same outcome as "no session".
    pub fn fail_restore(&self, reason: &str) {
        warn!(target: "alumni_portal::auth", "auth.restore failed: {}", reason);
        self.set_current(None);
    }

    pub fn current_identity(&self) -> Option<Identity> { self.current.read().clone() }

    pub fn subscriber_count(&self) -> usize { self.listeners.len() }

    fn set_current(&self, identity: Option<Identity>) {
        *self.current.write() = identity.clone();
        self.listeners.emit(identity);
    }
}

impl AuthProvider for LocalAuthProvider {
    fn subscribe(&self, callback: SessionCallback) -> Subscription {
        let sub = self.listeners.add(callback.clone());
        callback(self.current_identity());
        sub
    }

    fn sign_out(&self) -> AppResult<()> {
        if let Some(prev) = self.current_identity() {
            info!(target: "alumni_portal::auth", "auth.sign_out id={}", prev.id);
        }
        self.set_current(None);
        Ok(())
    }
}
