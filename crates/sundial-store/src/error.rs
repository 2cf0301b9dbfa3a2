use thiserror::Error;

/// Errors produced by the store layer.
///
/// The domain variants carry the exact user-facing message for that failure;
/// the HTTP layer only decides the status code.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error that is not one of the recognised domain failures.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A request field is missing or malformed.  The message names the field.
    #[error("{0}")]
    Validation(String),

    /// Lookup by client external id found nothing.
    #[error("Client not found. They may have been deleted by another user.")]
    ClientNotFound,

    /// Lookup by appointment external id found nothing.
    #[error("Appointment not found. It may have been deleted or modified by another user.")]
    AppointmentNotFound,

    /// The unique index on `clients.email` rejected an insert or update.
    #[error("A client with this email address already exists. Please use a different email.")]
    DuplicateEmail,

    /// Client deletion blocked by existing appointments.
    #[error("Cannot delete client with existing appointments. Please cancel or delete their appointments first.")]
    HasAppointments,

    /// Cancel requested on an appointment that is already cancelled.
    #[error("This appointment has already been cancelled.")]
    AlreadyCancelled,

    /// Cancel requested on a completed appointment.
    #[error("Cannot cancel a completed appointment.")]
    CancelCompleted,

    /// A status value outside {scheduled, completed, cancelled}.
    #[error("Invalid appointment status. Must be scheduled, completed, or cancelled.")]
    InvalidStatus,

    /// Status change requested on an appointment in a terminal state.
    #[error("Cannot change the status of a {0} appointment.")]
    TerminalStatus(crate::models::AppointmentStatus),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Translate a unique-constraint failure on `clients.email` into
/// [`StoreError::DuplicateEmail`]; every other error passes through.
pub(crate) fn map_email_conflict(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, Some(msg))
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.contains("clients.email") =>
        {
            StoreError::DuplicateEmail
        }
        _ => StoreError::Sqlite(e),
    }
}
