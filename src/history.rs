//! Durable chat history on SQLite.
//!
//! Conversations are identified by ids drawn from the `counters` table, not
//! from AUTOINCREMENT: the sequence survives deletes, never reuses an id, and
//! the allocation is a single upsert-and-increment statement so concurrent
//! turn handlers cannot draw the same id. Turn order within a conversation is
//! the rowid insertion order of the `turns` table.
//!
//! Missing conversations are reported as `false`/`None` rather than errors.
//! The caller decides whether that is worth surfacing; the store stays
//! unchanged either way.

use chrono::Utc;
use chrono_tz::Tz;
use diesel::prelude::*;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{Conversation, TurnRecord};

/// The counter row conversation ids are drawn from.
const CONVERSATION_COUNTER: &str = "history_id";

/// One user/assistant exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub user: String,
    pub ai: String,
}

/// Chat history store over one SQLite connection.
pub struct ChatHistoryStore {
    connection: SqliteConnection,
    tz: Tz,
}

/// Upsert-and-increment the conversation counter, returning the new value.
///
/// One statement, so SQLite's write lock is the only coordination needed.
fn allocate_conversation_id(conn: &mut SqliteConnection) -> QueryResult<i64> {
    use crate::schema::counters::dsl::*;

    diesel::insert_into(counters)
        .values((name.eq(CONVERSATION_COUNTER), value.eq(1_i64)))
        .on_conflict(name)
        .do_update()
        .set(value.eq(value + 1))
        .returning(value)
        .get_result(conn)
}

fn load_turns(conn: &mut SqliteConnection, conversation: i64) -> QueryResult<Vec<Turn>> {
    use crate::schema::turns::dsl::*;

    let records: Vec<TurnRecord> = turns
        .filter(conversation_id.eq(conversation))
        .order(id.asc())
        .load(conn)?;

    Ok(records
        .into_iter()
        .map(|r| Turn {
            user: r.user_text,
            ai: r.ai_text,
        })
        .collect())
}

impl ChatHistoryStore {
    /// Wrap an established connection; timestamps are stamped in `tz`.
    pub fn new(connection: SqliteConnection, tz: Tz) -> Self {
        Self { connection, tz }
    }

    /// Draw the next conversation id from the durable counter.
    pub fn next_conversation_id(&mut self) -> Result<i64> {
        let id = allocate_conversation_id(&mut self.connection)?;
        debug!(id, "allocated conversation id");
        Ok(id)
    }

    /// Start a new conversation holding one turn; returns its id.
    pub fn append_new(&mut self, username: &str, user_text: &str, ai_text: &str) -> Result<i64> {
        let created_at = Utc::now().with_timezone(&self.tz).to_rfc3339();

        let conversation = self.connection.transaction(|conn| {
            let new_id = allocate_conversation_id(conn)?;

            diesel::insert_into(crate::schema::conversations::table)
                .values(&Conversation {
                    conversation_id: new_id,
                    username: username.to_string(),
                    created_at,
                })
                .execute(conn)?;

            diesel::insert_into(crate::schema::turns::table)
                .values(&TurnRecord {
                    id: None,
                    conversation_id: new_id,
                    user_text: user_text.to_string(),
                    ai_text: ai_text.to_string(),
                })
                .execute(conn)?;

            QueryResult::Ok(new_id)
        })?;

        info!(conversation_id = conversation, username, "conversation started");
        Ok(conversation)
    }

    /// Append one turn to an existing conversation.
    ///
    /// Returns `false` (and writes nothing) when the conversation does not
    /// exist.
    pub fn append_turn(
        &mut self,
        conversation: i64,
        user_text: &str,
        ai_text: &str,
    ) -> Result<bool> {
        let appended = self.connection.transaction(|conn| {
            let exists: Option<Conversation> = crate::schema::conversations::table
                .find(conversation)
                .first(conn)
                .optional()?;

            if exists.is_none() {
                return QueryResult::Ok(false);
            }

            diesel::insert_into(crate::schema::turns::table)
                .values(&TurnRecord {
                    id: None,
                    conversation_id: conversation,
                    user_text: user_text.to_string(),
                    ai_text: ai_text.to_string(),
                })
                .execute(conn)?;

            QueryResult::Ok(true)
        })?;

        Ok(appended)
    }

    /// All turns of a conversation in append order, or `None` when the id is
    /// unknown.
    pub fn get_conversation(&mut self, conversation: i64) -> Result<Option<Vec<Turn>>> {
        let exists: Option<Conversation> = crate::schema::conversations::table
            .find(conversation)
            .first(&mut self.connection)
            .optional()?;

        if exists.is_none() {
            return Ok(None);
        }

        Ok(Some(load_turns(&mut self.connection, conversation)?))
    }

    /// Every conversation of `username`, newest first, each with its full
    /// turn list.
    pub fn list_conversations(&mut self, user: &str) -> Result<Vec<(i64, Vec<Turn>)>> {
        let ids: Vec<i64> = {
            use crate::schema::conversations::dsl::*;
            conversations
                .filter(username.eq(user))
                .order(conversation_id.desc())
                .select(conversation_id)
                .load(&mut self.connection)?
        };

        let mut result = Vec::with_capacity(ids.len());
        for conversation in ids {
            let turns = load_turns(&mut self.connection, conversation)?;
            result.push((conversation, turns));
        }
        Ok(result)
    }

    /// Delete a conversation and its turns. Returns `false` when there was
    /// nothing to delete; a second delete of the same id is a no-op.
    pub fn delete_conversation(&mut self, conversation: i64) -> Result<bool> {
        let deleted = self.connection.transaction(|conn| {
            diesel::delete(
                crate::schema::turns::table
                    .filter(crate::schema::turns::conversation_id.eq(conversation)),
            )
            .execute(conn)?;

            let rows = diesel::delete(crate::schema::conversations::table.find(conversation))
                .execute(conn)?;

            QueryResult::Ok(rows > 0)
        })?;

        if deleted {
            info!(conversation_id = conversation, "conversation deleted");
        }
        Ok(deleted)
    }
}
