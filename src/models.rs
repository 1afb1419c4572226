//! # Database models
//!
//! Data structures that map to the project's SQLite schema via **Diesel**.
//!
//! These models are used by higher-level modules to persist and query:
//!
//! - [`Section`]: one unit of raw corpus text, consumed by the chunker.
//! - [`Counter`]: named durable sequences (conversation-id allocation).
//! - [`Conversation`]: one chat thread, keyed by a monotonic integer id.
//! - [`TurnRecord`]: one user/AI exchange within a conversation.
//! - [`User`]: an account with hashed credentials.
//!
//! ## Diesel expectations
//!
//! This module assumes the tables declared in `crate::schema`:
//! `sections`, `counters`, `conversations`, `turns`, `users`.
//! [`crate::config::setup_schema`] creates them on first use.
//!
//! Records are explicit typed structs, validated at the persistence
//! boundary — never schema-less maps.

use diesel::prelude::*;

/// A unit of raw corpus text, created by ingestion and read-only afterwards.
///
/// Sections are the input to the index build step; they are never consulted
/// at query time (the index snapshot carries the chunk texts).
#[derive(Queryable, Insertable, Debug, Selectable, Clone)]
#[diesel(table_name = crate::schema::sections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Section {
    /// Auto-increment primary key (set by the DB on insert).
    #[diesel(deserialize_as = i32)]
    pub id: Option<i32>,
    /// Raw section text.
    pub content: String,
}

/// A named durable sequence.
///
/// The conversation-id sequence lives here under the name `"history_id"`.
/// Values only ever move forward; ids are never reused, even after the
/// conversation they were assigned to is deleted.
#[derive(Queryable, Insertable, Debug, Selectable, PartialEq)]
#[diesel(table_name = crate::schema::counters)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Counter {
    /// Sequence name (primary key).
    pub name: String,
    /// Last value handed out.
    pub value: i64,
}

/// One chat thread owned by a user.
///
/// The primary key is assigned by the counter, not by SQLite autoincrement,
/// so that multiple server instances sharing one store never collide.
#[derive(Queryable, Identifiable, Insertable, Debug, Selectable, Clone)]
#[diesel(table_name = crate::schema::conversations)]
#[diesel(primary_key(conversation_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Conversation {
    /// Monotonic id from the `"history_id"` counter.
    pub conversation_id: i64,
    /// Owning username.
    pub username: String,
    /// Creation timestamp, RFC 3339 in the store's configured zone.
    pub created_at: String,
}

/// One user/AI exchange within a [`Conversation`].
///
/// Append-only; the autoincrement row id defines turn order.
#[derive(Queryable, Associations, Insertable, Debug, Selectable, Clone)]
#[diesel(belongs_to(Conversation))]
#[diesel(table_name = crate::schema::turns)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TurnRecord {
    /// Auto-increment primary key; insertion order is turn order.
    #[diesel(deserialize_as = i32)]
    pub id: Option<i32>,
    /// Foreign key to the owning [`Conversation`].
    pub conversation_id: i64,
    /// What the user said (line breaks already `<br>`-encoded).
    pub user_text: String,
    /// What the model answered (line breaks already `<br>`-encoded).
    pub ai_text: String,
}

/// An account. `username` and `email` carry UNIQUE constraints in the DB;
/// the store additionally checks them before writes so collisions surface
/// as booleans rather than constraint violations.
#[derive(Queryable, Insertable, Debug, Selectable, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    /// Auto-increment primary key (set by the DB on insert).
    #[diesel(deserialize_as = i32)]
    pub id: Option<i32>,
    /// Unique display/login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Argon2 PHC string. Plaintext passwords are never stored or logged.
    pub password_hash: String,
}
