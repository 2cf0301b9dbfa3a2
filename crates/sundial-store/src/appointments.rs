//! CRUD operations for [`Appointment`] records, the status state machine,
//! and the atomic create-with-new-client transaction.
//!
//! Appointments reference their client by the client's public `external_id`;
//! the link is checked against the clients table at creation and whenever an
//! update changes it.

use chrono::Utc;
use rusqlite::params;

use crate::clients::{normalize_email, normalize_phone};
use crate::database::Database;
use crate::error::{map_email_conflict, Result, StoreError};
use crate::external_id;
use crate::models::{
    row_to_appointment, row_to_appointment_with_client, Appointment, AppointmentStatus,
    AppointmentUpdate, AppointmentWithClient, NewAppointment, NewClientAppointment,
};
use crate::validate;

const APPOINTMENT_COLUMNS: &str =
    "id, external_id, client_id, appointment_time, status, created_at, updated_at";

/// Appointments joined with their client's contact details.  The join key is
/// the client's `external_id`, not the numeric primary key.
const JOINED_SELECT: &str = "\
    SELECT a.id, a.external_id, a.client_id, a.appointment_time, a.status,
           a.created_at, a.updated_at,
           c.name AS client_name, c.email AS client_email, c.phone AS client_phone
    FROM appointments a
    JOIN clients c ON c.external_id = a.client_id";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Validate and insert a new appointment for an existing client.
    ///
    /// The referenced client must exist and the time must parse to a moment
    /// strictly in the future.  The initial status is always `scheduled`.
    pub fn create_appointment(&self, new: &NewAppointment) -> Result<Appointment> {
        validate::required_fields(&[
            ("client_id", new.client_id.as_deref()),
            ("time", new.time.as_deref()),
        ])?;

        let client_id = new.client_id.as_deref().unwrap_or_default();
        self.get_client(client_id)?;

        let when = validate::appointment_time(new.time.as_deref().unwrap_or_default())?;

        let external_id = external_id::generate();
        let now = Utc::now().to_rfc3339();

        self.conn().execute(
            "INSERT INTO appointments
                 (external_id, client_id, appointment_time, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                external_id,
                client_id,
                when.to_rfc3339(),
                AppointmentStatus::Scheduled.as_str(),
                now,
                now,
            ],
        )?;

        let id = self.conn().last_insert_rowid();
        let appointment = self.conn().query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id],
            row_to_appointment,
        )?;

        tracing::debug!(
            external_id = %appointment.external_id,
            client_id = %appointment.client_id,
            "created appointment"
        );
        Ok(appointment)
    }

    /// Atomically create a new client and their first appointment.
    ///
    /// Everything is validated before the transaction opens.  Either both
    /// rows are durably inserted or neither is: a duplicate email (or any
    /// other insert failure) rolls the whole unit of work back, so readers
    /// never observe an appointment without its client.
    pub fn create_appointment_with_new_client(
        &mut self,
        new: &NewClientAppointment,
    ) -> Result<AppointmentWithClient> {
        validate::required_fields(&[
            ("name", new.name.as_deref()),
            ("email", new.email.as_deref()),
            ("time", new.time.as_deref()),
        ])?;
        validate::email(new.email.as_deref().unwrap_or_default())?;
        validate::phone(new.phone.as_deref())?;
        let when = validate::appointment_time(new.time.as_deref().unwrap_or_default())?;

        let name = new.name.as_deref().unwrap_or_default().trim().to_string();
        let email = normalize_email(new.email.as_deref().unwrap_or_default());
        let phone = normalize_phone(new.phone.as_deref());

        let client_external_id = external_id::generate();
        let appointment_external_id = external_id::generate();
        let now = Utc::now().to_rfc3339();

        // Dropping the transaction on any early return rolls it back.
        let tx = self.conn_mut().transaction()?;

        tx.execute(
            "INSERT INTO clients (external_id, name, email, phone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![client_external_id, name, email, phone, now, now],
        )
        .map_err(map_email_conflict)?;

        tx.execute(
            "INSERT INTO appointments
                 (external_id, client_id, appointment_time, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                appointment_external_id,
                client_external_id,
                when.to_rfc3339(),
                AppointmentStatus::Scheduled.as_str(),
                now,
                now,
            ],
        )?;

        let joined = tx.query_row(
            &format!("{JOINED_SELECT} WHERE a.external_id = ?1"),
            params![appointment_external_id],
            row_to_appointment_with_client,
        )?;

        tx.commit()?;

        tracing::debug!(
            client = %joined.client_id,
            appointment = %joined.external_id,
            "created appointment with new client"
        );
        Ok(joined)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// List all appointments in stable storage order.
    pub fn list_appointments(&self) -> Result<Vec<Appointment>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments"))?;

        let rows = stmt.query_map([], row_to_appointment)?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?);
        }
        Ok(appointments)
    }

    /// List all appointments joined with their client's name/email/phone.
    pub fn list_appointments_with_clients(&self) -> Result<Vec<AppointmentWithClient>> {
        let mut stmt = self.conn().prepare(JOINED_SELECT)?;

        let rows = stmt.query_map([], row_to_appointment_with_client)?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?);
        }
        Ok(appointments)
    }

    /// Fetch a single appointment by public identifier.
    pub fn get_appointment(&self, external_id: &str) -> Result<Appointment> {
        self.conn()
            .query_row(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE external_id = ?1"),
                params![external_id],
                row_to_appointment,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::AppointmentNotFound,
                other => StoreError::Sqlite(other),
            })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a partial update to an appointment.
    ///
    /// A new `client_id` must reference an existing client, a new `time`
    /// must be a valid future moment, and a new `status` must be one of the
    /// three known values.  Completed and cancelled appointments refuse
    /// status changes.  `updated_at` is always refreshed.
    pub fn update_appointment(
        &self,
        external_id: &str,
        update: &AppointmentUpdate,
    ) -> Result<Appointment> {
        let mut appointment = self.get_appointment(external_id)?;

        if let Some(client_id) = update.client_id.as_deref() {
            self.get_client(client_id)?;
            appointment.client_id = client_id.to_string();
        }
        if let Some(time) = update.time.as_deref() {
            appointment.appointment_time = validate::appointment_time(time)?;
        }
        if let Some(status) = update.status.as_deref() {
            let status: AppointmentStatus = status.parse()?;
            if appointment.status.is_terminal() && status != appointment.status {
                return Err(StoreError::TerminalStatus(appointment.status));
            }
            appointment.status = status;
        }
        appointment.updated_at = Utc::now();

        self.conn().execute(
            "UPDATE appointments
             SET client_id = ?1, appointment_time = ?2, status = ?3, updated_at = ?4
             WHERE external_id = ?5",
            params![
                appointment.client_id,
                appointment.appointment_time.to_rfc3339(),
                appointment.status.as_str(),
                appointment.updated_at.to_rfc3339(),
                appointment.external_id,
            ],
        )?;

        Ok(appointment)
    }

    /// Cancel a scheduled appointment.
    ///
    /// Fails if the appointment is already cancelled or has been completed.
    pub fn cancel_appointment(&self, external_id: &str) -> Result<Appointment> {
        let mut appointment = self.get_appointment(external_id)?;

        match appointment.status {
            AppointmentStatus::Cancelled => return Err(StoreError::AlreadyCancelled),
            AppointmentStatus::Completed => return Err(StoreError::CancelCompleted),
            AppointmentStatus::Scheduled => {}
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = Utc::now();

        self.conn().execute(
            "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE external_id = ?3",
            params![
                appointment.status.as_str(),
                appointment.updated_at.to_rfc3339(),
                appointment.external_id,
            ],
        )?;

        Ok(appointment)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete an appointment unconditionally (after the existence check).
    pub fn delete_appointment(&self, external_id: &str) -> Result<()> {
        let appointment = self.get_appointment(external_id)?;

        self.conn().execute(
            "DELETE FROM appointments WHERE external_id = ?1",
            params![appointment.external_id],
        )?;

        tracing::debug!(external_id = %appointment.external_id, "deleted appointment");
        Ok(())
    }
}
