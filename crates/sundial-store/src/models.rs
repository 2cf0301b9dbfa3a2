//! Domain model structs persisted in the SQLite database, plus the input
//! structs accepted by the repository methods.
//!
//! Every persisted struct derives `Serialize` so it can be handed directly to
//! the HTTP layer; the input structs derive `Deserialize` with
//! `deny_unknown_fields` so malformed request bodies are rejected rather than
//! silently coerced.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Appointment status
// ---------------------------------------------------------------------------

/// Lifecycle state of an appointment.
///
/// `Scheduled` is the only initial state.  `Completed` and `Cancelled` are
/// terminal: no transition may leave them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// The lowercase form stored in SQLite and used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the lowercase form; `None` for anything outside the enum.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether the status permits no further transition.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(StoreError::InvalidStatus)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A client of the practice.
///
/// `external_id` is the public identifier used in API paths and as the
/// appointment-side reference; the numeric `id` is a storage detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    /// Internal surrogate key, assigned by SQLite, never reused.
    pub id: i64,
    /// Public identifier, unique and immutable.
    pub external_id: String,
    /// Display name, trimmed.
    pub name: String,
    /// Contact email, stored lowercased, unique across all clients.
    pub email: String,
    /// Optional contact phone number, trimmed.
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a client.  Required-field checking happens
/// in the repository so missing values produce field-specific messages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewClient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Partial update for a client.  Absent fields are left untouched; a `phone`
/// of JSON `null` clears the stored number.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// Appointment
// ---------------------------------------------------------------------------

/// A scheduled appointment.
///
/// `client_id` holds the referenced client's `external_id`; the link is
/// validated at the application layer rather than by a SQL constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    /// Internal surrogate key.
    pub id: i64,
    /// Public identifier, unique and immutable.
    pub external_id: String,
    /// The referenced client's `external_id`.
    pub client_id: String,
    /// When the appointment takes place.  Validated to be in the future at
    /// creation time only.
    pub appointment_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation.
    pub updated_at: DateTime<Utc>,
}

/// An appointment joined with its client's contact details, for list views
/// and the atomic create-with-new-client response.  Client fields are
/// aliased to avoid colliding with the appointment's own columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentWithClient {
    pub id: i64,
    pub external_id: String,
    pub client_id: String,
    pub appointment_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
}

/// Fields accepted when creating an appointment for an existing client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewAppointment {
    pub client_id: Option<String>,
    /// Raw date/time string; parsed and future-checked by the repository.
    pub time: Option<String>,
}

/// Partial update for an appointment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppointmentUpdate {
    pub client_id: Option<String>,
    pub time: Option<String>,
    pub status: Option<String>,
}

/// Fields accepted by the atomic create-with-new-client operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewClientAppointment {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub time: Option<String>,
}

/// Distinguish "field absent" (outer `None`) from "field explicitly null"
/// (`Some(None)`) when deserializing partial updates.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Row mappers
// ---------------------------------------------------------------------------
// Shared between the repository modules and the create-with-new-client
// transaction, which reads rows through a `rusqlite::Transaction`.

/// Map a `rusqlite::Row` ordered as
/// `id, external_id, name, email, phone, created_at, updated_at` to a [`Client`].
pub(crate) fn row_to_client(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        external_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        created_at: timestamp_col(row, 5)?,
        updated_at: timestamp_col(row, 6)?,
    })
}

/// Map a `rusqlite::Row` ordered as
/// `id, external_id, client_id, appointment_time, status, created_at, updated_at`
/// to an [`Appointment`].
pub(crate) fn row_to_appointment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        external_id: row.get(1)?,
        client_id: row.get(2)?,
        appointment_time: timestamp_col(row, 3)?,
        status: status_col(row, 4)?,
        created_at: timestamp_col(row, 5)?,
        updated_at: timestamp_col(row, 6)?,
    })
}

/// Map a joined row (appointment columns followed by
/// `client_name, client_email, client_phone`) to an [`AppointmentWithClient`].
pub(crate) fn row_to_appointment_with_client(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<AppointmentWithClient> {
    Ok(AppointmentWithClient {
        id: row.get(0)?,
        external_id: row.get(1)?,
        client_id: row.get(2)?,
        appointment_time: timestamp_col(row, 3)?,
        status: status_col(row, 4)?,
        created_at: timestamp_col(row, 5)?,
        updated_at: timestamp_col(row, 6)?,
        client_name: row.get(7)?,
        client_email: row.get(8)?,
        client_phone: row.get(9)?,
    })
}

/// Read an RFC-3339 TEXT column as a `DateTime<Utc>`.
fn timestamp_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Read a status TEXT column as an [`AppointmentStatus`].
fn status_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<AppointmentStatus> {
    let raw: String = row.get(idx)?;
    AppointmentStatus::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown appointment status: {raw}").into(),
        )
    })
}
