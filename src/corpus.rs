//! Corpus store: the raw text sections the knowledge base is built from.
//!
//! Sections are written by ingestion and read in full by the index build.
//! At query time the corpus is never consulted — the vector index snapshot
//! carries the chunk texts — so this store is read-only on the request path.

use diesel::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::models::Section;

/// Insert one raw section into the corpus.
pub fn add_section(connection: &mut SqliteConnection, content: &str) -> Result<Section> {
    let section = connection.transaction(|conn| {
        diesel::insert_into(crate::schema::sections::table)
            .values(&Section {
                id: None,
                content: content.to_string(),
            })
            .returning(Section::as_returning())
            .get_result(conn)
    })?;

    info!(id = ?section.id, chars = content.len(), "section ingested");
    Ok(section)
}

/// Load every section's text, in insertion order.
///
/// This is the input to the chunk → embed → index build step.
pub fn all_contents(connection: &mut SqliteConnection) -> Result<Vec<String>> {
    use crate::schema::sections::dsl::*;

    let rows: Vec<Section> = sections.order(id.asc()).load(connection)?;
    Ok(rows.into_iter().map(|s| s.content).collect())
}
