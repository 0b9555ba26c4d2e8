// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema migrations, embedded at build time.
//!
//! [`Database::open`](crate::Database::open) applies any pending migration
//! before handing out the connection; refinery records what has already run
//! in its `refinery_schema_history` table.

use amiko_core::AmikoError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies every migration not yet recorded against this database.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), AmikoError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| AmikoError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
