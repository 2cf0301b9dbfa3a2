//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `clients` and `appointments`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Clients
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS clients (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT NOT NULL UNIQUE,            -- public identifier
    name        TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,            -- stored lowercased
    phone       TEXT,
    created_at  TEXT NOT NULL,                   -- ISO-8601 / RFC-3339
    updated_at  TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Appointments
-- ----------------------------------------------------------------
-- client_id references clients.external_id.  The link is validated at the
-- application layer, not by a SQL foreign key, so clients and appointments
-- can be exported/imported independently.
CREATE TABLE IF NOT EXISTS appointments (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id      TEXT NOT NULL UNIQUE,
    client_id        TEXT NOT NULL,
    appointment_time TEXT NOT NULL,              -- ISO-8601 / RFC-3339
    status           TEXT NOT NULL DEFAULT 'scheduled',
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_client_id
    ON appointments(client_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
