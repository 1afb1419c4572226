//! User accounts on SQLite, with argon2 password hashing.
//!
//! Usernames and emails are unique across the table; a profile update checks
//! both fields against every row except the account being updated. Collisions
//! and missing rows come back as `None`/`false`, matching the history store's
//! not-found convention. Password hashes never leave this module.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use diesel::prelude::*;
use tracing::info;

use crate::error::{DocentError, Result};
use crate::models::User;

/// An account as exposed to callers. The stored hash stays internal.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl From<User> for Account {
    fn from(user: User) -> Self {
        Self {
            // Rows loaded from the table always carry an id.
            id: user.id.unwrap_or_default(),
            username: user.username,
            email: user.email,
        }
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DocentError::Credential(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Account store over one SQLite connection.
pub struct AccountStore {
    connection: SqliteConnection,
}

impl AccountStore {
    pub fn new(connection: SqliteConnection) -> Self {
        Self { connection }
    }

    /// Register a new account. `None` when the username or email is already
    /// taken.
    pub fn create(
        &mut self,
        new_username: &str,
        new_email: &str,
        password: &str,
    ) -> Result<Option<Account>> {
        let hashed_password = hash_password(password)?;

        let created: Option<User> = self.connection.transaction(|conn| {
            use crate::schema::users::dsl::*;

            let taken: i64 = users
                .filter(username.eq(new_username).or(email.eq(new_email)))
                .count()
                .get_result(conn)?;
            if taken > 0 {
                return QueryResult::Ok(None);
            }

            let user = diesel::insert_into(users)
                .values(&User {
                    id: None,
                    username: new_username.to_string(),
                    email: new_email.to_string(),
                    password_hash: hashed_password.clone(),
                })
                .returning(User::as_returning())
                .get_result(conn)?;

            QueryResult::Ok(Some(user))
        })?;

        if let Some(ref user) = created {
            info!(username = %user.username, "account created");
        }
        Ok(created.map(Account::from))
    }

    /// Look up by email and verify the password. `None` when either fails;
    /// the caller cannot tell which.
    pub fn authenticate(&mut self, by_email: &str, password: &str) -> Result<Option<Account>> {
        use crate::schema::users::dsl::*;

        let user: Option<User> = users
            .filter(email.eq(by_email))
            .first(&mut self.connection)
            .optional()?;

        Ok(user
            .filter(|u| verify_password(password, &u.password_hash))
            .map(Account::from))
    }

    /// Change username and email. `false` when the account is missing or
    /// another account already holds either value.
    pub fn update_profile(
        &mut self,
        account_id: i32,
        new_username: &str,
        new_email: &str,
    ) -> Result<bool> {
        let updated = self.connection.transaction(|conn| {
            use crate::schema::users::dsl::*;

            let taken: i64 = users
                .filter(username.eq(new_username).or(email.eq(new_email)))
                .filter(id.ne(account_id))
                .count()
                .get_result(conn)?;
            if taken > 0 {
                return QueryResult::Ok(false);
            }

            let rows = diesel::update(users.find(account_id))
                .set((username.eq(new_username), email.eq(new_email)))
                .execute(conn)?;

            QueryResult::Ok(rows > 0)
        })?;

        Ok(updated)
    }

    /// Remove an account. `false` when it does not exist. Conversations the
    /// account owned are left to the caller to clean up.
    pub fn delete(&mut self, account_id: i32) -> Result<bool> {
        use crate::schema::users::dsl::*;

        let rows = diesel::delete(users.find(account_id)).execute(&mut self.connection)?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{establish_connection, setup_schema};
    use tempfile::TempDir;

    fn test_store() -> (AccountStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.db");
        let mut conn = establish_connection(path.to_str().unwrap()).unwrap();
        setup_schema(&mut conn).unwrap();
        (AccountStore::new(conn), dir)
    }

    #[test]
    fn test_create_rejects_taken_username_and_email() {
        let (mut store, _dir) = test_store();
        let account = store.create("mina", "mina@example.com", "s3cret").unwrap();
        assert!(account.is_some());

        assert!(store.create("mina", "other@example.com", "pw").unwrap().is_none());
        assert!(store.create("other", "mina@example.com", "pw").unwrap().is_none());
        assert!(store.create("other", "other@example.com", "pw").unwrap().is_some());
    }

    #[test]
    fn test_authenticate_verifies_password() {
        let (mut store, _dir) = test_store();
        store.create("mina", "mina@example.com", "s3cret").unwrap();

        let ok = store.authenticate("mina@example.com", "s3cret").unwrap();
        assert_eq!(ok.unwrap().username, "mina");

        assert!(store.authenticate("mina@example.com", "wrong").unwrap().is_none());
        assert!(store.authenticate("ghost@example.com", "s3cret").unwrap().is_none());
    }

    #[test]
    fn test_password_is_stored_hashed() {
        let (mut store, _dir) = test_store();
        store.create("mina", "mina@example.com", "s3cret").unwrap();

        use crate::schema::users::dsl::*;
        let user: User = users.first(&mut store.connection).unwrap();
        assert_ne!(user.password_hash, "s3cret");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn test_update_profile_excludes_self_from_uniqueness() {
        let (mut store, _dir) = test_store();
        let mina = store.create("mina", "mina@example.com", "pw").unwrap().unwrap();
        store.create("other", "other@example.com", "pw").unwrap();

        // Keeping your own username while changing email is not a collision.
        assert!(store.update_profile(mina.id, "mina", "new@example.com").unwrap());
        // Taking another account's username is.
        assert!(!store.update_profile(mina.id, "other", "new@example.com").unwrap());
        // Unknown account.
        assert!(!store.update_profile(9999, "ghost", "g@example.com").unwrap());
    }

    #[test]
    fn test_delete_reports_missing() {
        let (mut store, _dir) = test_store();
        let mina = store.create("mina", "mina@example.com", "pw").unwrap().unwrap();

        assert!(store.delete(mina.id).unwrap());
        assert!(!store.delete(mina.id).unwrap());
        assert!(store.authenticate("mina@example.com", "pw").unwrap().is_none());
    }
}
