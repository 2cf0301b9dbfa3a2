//! CRUD operations for [`Client`] records.
//!
//! All writes validate first, so a failed request leaves no partial state.
//! Email is normalised to lowercase before it hits the unique index, which
//! makes the uniqueness check case-insensitive.

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::{map_email_conflict, Result, StoreError};
use crate::external_id;
use crate::models::{row_to_client, Client, ClientUpdate, NewClient};
use crate::validate;

const CLIENT_COLUMNS: &str = "id, external_id, name, email, phone, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Validate and insert a new client, returning the persisted record
    /// including the generated `external_id` and timestamps.
    pub fn create_client(&self, new: &NewClient) -> Result<Client> {
        validate::required_fields(&[
            ("name", new.name.as_deref()),
            ("email", new.email.as_deref()),
        ])?;
        validate::email(new.email.as_deref().unwrap_or_default())?;
        validate::phone(new.phone.as_deref())?;

        let name = new.name.as_deref().unwrap_or_default().trim().to_string();
        let email = normalize_email(new.email.as_deref().unwrap_or_default());
        let phone = normalize_phone(new.phone.as_deref());

        let external_id = external_id::generate();
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO clients (external_id, name, email, phone, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![external_id, name, email, phone, now, now],
            )
            .map_err(map_email_conflict)?;

        let id = self.conn().last_insert_rowid();
        let client = self.conn().query_row(
            &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"),
            params![id],
            row_to_client,
        )?;

        tracing::debug!(external_id = %client.external_id, "created client");
        Ok(client)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// List all clients in stable storage order.
    pub fn list_clients(&self) -> Result<Vec<Client>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {CLIENT_COLUMNS} FROM clients"))?;

        let rows = stmt.query_map([], row_to_client)?;

        let mut clients = Vec::new();
        for row in rows {
            clients.push(row?);
        }
        Ok(clients)
    }

    /// Fetch a single client by public identifier.
    pub fn get_client(&self, external_id: &str) -> Result<Client> {
        self.conn()
            .query_row(
                &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE external_id = ?1"),
                params![external_id],
                row_to_client,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::ClientNotFound,
                other => StoreError::Sqlite(other),
            })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a partial update to a client.
    ///
    /// Only supplied fields change; email and phone are re-validated and
    /// re-normalised when present, and `updated_at` is always refreshed.
    pub fn update_client(&self, external_id: &str, update: &ClientUpdate) -> Result<Client> {
        let mut client = self.get_client(external_id)?;

        if let Some(email) = update.email.as_deref() {
            validate::email(email)?;
            client.email = normalize_email(email);
        }
        if let Some(name) = update.name.as_deref() {
            client.name = name.trim().to_string();
        }
        if let Some(phone) = &update.phone {
            validate::phone(phone.as_deref())?;
            client.phone = normalize_phone(phone.as_deref());
        }
        client.updated_at = Utc::now();

        self.conn()
            .execute(
                "UPDATE clients SET name = ?1, email = ?2, phone = ?3, updated_at = ?4
                 WHERE external_id = ?5",
                params![
                    client.name,
                    client.email,
                    client.phone,
                    client.updated_at.to_rfc3339(),
                    client.external_id,
                ],
            )
            .map_err(map_email_conflict)?;

        Ok(client)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a client, provided it has no appointments of any status.
    pub fn delete_client(&self, external_id: &str) -> Result<()> {
        let client = self.get_client(external_id)?;

        let appointment_count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM appointments WHERE client_id = ?1",
            params![client.external_id],
            |row| row.get(0),
        )?;
        if appointment_count > 0 {
            return Err(StoreError::HasAppointments);
        }

        self.conn().execute(
            "DELETE FROM clients WHERE external_id = ?1",
            params![client.external_id],
        )?;

        tracing::debug!(external_id = %client.external_id, "deleted client");
        Ok(())
    }
}

/// Trim and lowercase, so the unique index compares case-insensitively.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim; blank input stores NULL.
pub(crate) fn normalize_phone(phone: Option<&str>) -> Option<String> {
    phone
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
}
