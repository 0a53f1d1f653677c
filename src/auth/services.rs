use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::password::{hash_password, verify_against_dummy, verify_password};
use super::repo::UserRepo;
use super::repo_types::User;
use crate::db::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Username already exists")]
    DuplicateUsername,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Username must be 3-32 characters: letters, digits, '_', '.', '-'")]
    InvalidUsername,
    #[error("Password must not be empty")]
    EmptyPassword,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Creates a regular user. Returns the new user's id.
pub async fn register(
    users: &dyn UserRepo,
    username: &str,
    password: &str,
) -> Result<i64, CredentialError> {
    let username = username.trim();
    if !is_valid_username(username) {
        return Err(CredentialError::InvalidUsername);
    }
    if password.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }
    if users.find_by_username(username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(CredentialError::DuplicateUsername);
    }

    let hash = hash_password(password).await?;
    match users.create(username, &hash, false).await {
        Ok(user) => {
            info!(user_id = user.id, username = %user.username, "user registered");
            Ok(user.id)
        }
        // lost a race with a concurrent registration of the same name
        Err(RepoError::Conflict) => Err(CredentialError::DuplicateUsername),
        Err(RepoError::Other(e)) => Err(e.into()),
    }
}

/// Looks the user up and checks the password. Unknown users and wrong
/// passwords produce the same error.
pub async fn authenticate(
    users: &dyn UserRepo,
    username: &str,
    password: &str,
) -> Result<User, CredentialError> {
    let username = username.trim();
    let Some(user) = users.find_by_username(username).await? else {
        verify_against_dummy(password).await;
        warn!(%username, "login for unknown user");
        return Err(CredentialError::InvalidCredentials);
    };

    if !verify_password(password, &user.hashed_password).await? {
        warn!(user_id = user.id, "login with invalid password");
        return Err(CredentialError::InvalidCredentials);
    }
    Ok(user)
}

/// Creates the admin account if no user with that name exists yet.
pub async fn ensure_admin(
    users: &dyn UserRepo,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    if users.find_by_username(username).await?.is_some() {
        info!(%username, "admin already exists");
        return Ok(());
    }
    let hash = hash_password(password).await?;
    match users.create(username, &hash, true).await {
        Ok(user) => {
            info!(user_id = user.id, %username, "admin user created");
            Ok(())
        }
        Err(RepoError::Conflict) => Ok(()),
        Err(RepoError::Other(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    #[test]
    fn username_rules() {
        assert!(is_valid_username("alice"));
        assert!(is_valid_username("bob.smith-2"));
        assert!(!is_valid_username("al"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"x".repeat(33)));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() {
        let store = MemoryStore::default();
        register(&store, "alice", "pw1").await.expect("first register");
        let err = register(&store, "alice", "other").await.unwrap_err();
        assert!(matches!(err, CredentialError::DuplicateUsername));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn authenticate_does_not_reveal_which_part_failed() {
        let store = MemoryStore::default();
        register(&store, "alice", "pw1").await.unwrap();

        let wrong_pw = authenticate(&store, "alice", "nope").await.unwrap_err();
        let unknown = authenticate(&store, "mallory", "pw1").await.unwrap_err();
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert!(matches!(unknown, CredentialError::InvalidCredentials));

        let user = authenticate(&store, " alice ", "pw1").await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(!user.is_admin);
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let store = MemoryStore::default();
        ensure_admin(&store, "root", "toor").await.unwrap();
        ensure_admin(&store, "root", "changed").await.unwrap();

        let users = store.list().await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].is_admin);
        assert!(authenticate(&store, "root", "toor").await.is_ok());
    }
}
