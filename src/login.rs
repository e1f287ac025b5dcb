use crate::error::{DashboardError, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Minimum password length accepted on signup
pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Who a successful sign-in or sign-up belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub email: String,
}

/// Account data stored per user
///
/// Only the Argon2 hash is kept; the plaintext password never touches disk.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Account {
    /// Email address (unique identifier)
    pub email: String,

    /// Argon2 hash of the user's password
    pub password_hash: String,
}

/// Email/password credentials from the login and signup forms
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCredentials {
    pub email: String,

    /// Password in plaintext (only transmitted, never stored)
    pub password: String,

    /// Display name, only sent on signup
    #[serde(default)]
    pub name: String,
}

/// Email/password authentication
pub trait AuthProvider: Send + Sync {
    /// # Errors
    /// * `Auth` for unknown accounts or a wrong password
    fn sign_in(&self, email: &str, password: &str) -> Result<Identity>;

    /// # Errors
    /// * `Auth` for empty or malformed input, short passwords, or an
    ///   email that is already registered
    fn sign_up(&self, email: &str, password: &str) -> Result<Identity>;
}

/// Accounts kept in a JSON file next to the record store
///
/// Reads and writes go through a mutex so two signups cannot both claim
/// the same email.
pub struct LocalAuth {
    users_file: PathBuf,
    lock: Mutex<()>,
}

impl LocalAuth {
    /// Open the account file in `dir`, creating an empty one if needed
    ///
    /// # Examples
    /// ```
    /// use ethanol_dashboard::login::{AuthProvider, LocalAuth};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let auth = LocalAuth::open(dir.path()).unwrap();
    /// auth.sign_up("asha@example.org", "s3cret!").unwrap();
    /// assert!(auth.sign_in("asha@example.org", "s3cret!").is_ok());
    /// ```
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            create_dir_all(dir)?;
        }

        let users_file = dir.join("users.json");
        if !users_file.exists() {
            let mut file = File::create(&users_file)?;
            file.write_all(b"{}")?;
        }

        Ok(LocalAuth {
            users_file,
            lock: Mutex::new(()),
        })
    }

    fn get_accounts(&self) -> Result<HashMap<String, Account>> {
        let contents = fs::read_to_string(&self.users_file)
            .map_err(|_| DashboardError::Store("Failed to read users file".to_string()))?;
        serde_json::from_str(&contents)
            .map_err(|_| DashboardError::Store("Failed to parse users data".to_string()))
    }

    fn save_accounts(&self, accounts: &HashMap<String, Account>) -> Result<()> {
        let json = serde_json::to_string_pretty(accounts)?;
        fs::write(&self.users_file, json)
            .map_err(|_| DashboardError::Store("Failed to write users data".to_string()))
    }
}

impl AuthProvider for LocalAuth {
    fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let email = email.trim();
        let accounts = {
            let _guard = self.lock.lock().map_err(|_| auth_lock_poisoned())?;
            self.get_accounts()?
        };

        let account = accounts
            .get(email)
            .ok_or_else(|| DashboardError::Auth("Invalid email or password".to_string()))?;

        if verify_password(password, &account.password_hash)? {
            Ok(Identity {
                email: email.to_string(),
            })
        } else {
            Err(DashboardError::Auth("Invalid email or password".to_string()))
        }
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(DashboardError::Auth(
                "Email and password cannot be empty".to_string(),
            ));
        }
        if !EMAIL_RE.is_match(email) {
            return Err(DashboardError::Auth("Invalid email address".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DashboardError::Auth(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let _guard = self.lock.lock().map_err(|_| auth_lock_poisoned())?;
        let mut accounts = self.get_accounts()?;
        if accounts.contains_key(email) {
            return Err(DashboardError::Auth(
                "Email address is already registered".to_string(),
            ));
        }

        let password_hash = hash_password(password)?;
        accounts.insert(
            email.to_string(),
            Account {
                email: email.to_string(),
                password_hash,
            },
        );
        self.save_accounts(&accounts)?;

        Ok(Identity {
            email: email.to_string(),
        })
    }
}

fn auth_lock_poisoned() -> DashboardError {
    DashboardError::Store("account lock poisoned".to_string())
}

/// Hash a password with Argon2id and a random salt.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err(DashboardError::Auth("Password hashing failed".to_string())),
    }
}

/// Check a password against a stored hash; `Ok(false)` on mismatch.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err(DashboardError::Store("Invalid password hash format".to_string())),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn auth() -> (TempDir, LocalAuth) {
        let dir = TempDir::new().unwrap();
        let auth = LocalAuth::open(dir.path()).unwrap();
        (dir, auth)
    }

    #[test]
    fn sign_up_then_sign_in() {
        let (_dir, auth) = auth();
        let identity = auth.sign_up("ravi@example.org", "hunter22").unwrap();
        assert_eq!(identity.email, "ravi@example.org");
        assert_eq!(auth.sign_in(" ravi@example.org ", "hunter22").unwrap(), identity);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let (_dir, auth) = auth();
        auth.sign_up("ravi@example.org", "hunter22").unwrap();
        assert!(matches!(
            auth.sign_in("ravi@example.org", "hunter23"),
            Err(DashboardError::Auth(_))
        ));
        assert!(matches!(
            auth.sign_in("nobody@example.org", "hunter22"),
            Err(DashboardError::Auth(_))
        ));
    }

    #[test]
    fn duplicate_sign_up_is_rejected() {
        let (_dir, auth) = auth();
        auth.sign_up("ravi@example.org", "hunter22").unwrap();
        assert!(matches!(
            auth.sign_up("ravi@example.org", "another1"),
            Err(DashboardError::Auth(_))
        ));
    }

    #[rstest]
    #[case("", "hunter22")]
    #[case("ravi@example.org", "")]
    #[case("not-an-email", "hunter22")]
    #[case("ravi@example.org", "short")]
    fn bad_sign_up_input(#[case] email: &str, #[case] password: &str) {
        let (_dir, auth) = auth();
        assert!(matches!(auth.sign_up(email, password), Err(DashboardError::Auth(_))));
    }

    #[test]
    fn hashes_are_not_plaintext() {
        let (dir, auth) = auth();
        auth.sign_up("ravi@example.org", "hunter22").unwrap();
        let raw = fs::read_to_string(dir.path().join("users.json")).unwrap();
        assert!(!raw.contains("hunter22"));
        assert!(raw.contains("$argon2"));
    }
}
