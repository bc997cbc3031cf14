//! Error type for the reminder service.
//!
//! Remote failures are split by what they interrupt: a fetch error aborts the
//! cycle that needed the data, an update error (archive or mail send) is
//! logged and the batch carries on.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderError {
    /// Querying or reading from the task database failed in transport or
    /// while decoding the response
    #[error("Remote fetch failed ({context}): {source}")]
    RemoteFetch {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// The task database answered a read with a non-success status
    #[error("Remote returned {status} ({context}): {body}")]
    RemoteStatus {
        context: String,
        status: StatusCode,
        body: String,
    },

    /// Archiving a page or sending a mail failed
    #[error("Remote update failed ({context}): {source}")]
    RemoteUpdate {
        context: String,
        #[source]
        source: RemoteFailure,
    },

    /// A record is missing a field the service relies on
    #[error("Malformed record {page_id}: missing or invalid {field}")]
    MalformedRecord { page_id: String, field: &'static str },

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Why a single HTTP exchange failed
#[derive(Debug, Error)]
pub enum RemoteFailure {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl RemoteFailure {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RemoteFailure::Transport(e) => e.status(),
            RemoteFailure::Status { status, .. } => Some(*status),
        }
    }

    /// Classify a failed read
    pub fn into_fetch(self, context: impl Into<String>) -> ReminderError {
        let context = context.into();
        match self {
            RemoteFailure::Transport(source) => ReminderError::RemoteFetch { context, source },
            RemoteFailure::Status { status, body } => ReminderError::RemoteStatus {
                context,
                status,
                body,
            },
        }
    }
}

impl ReminderError {
    pub fn status(context: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        ReminderError::RemoteStatus {
            context: context.into(),
            status,
            body: body.into(),
        }
    }

    pub fn update(context: impl Into<String>, failure: impl Into<RemoteFailure>) -> Self {
        ReminderError::RemoteUpdate {
            context: context.into(),
            source: failure.into(),
        }
    }

    pub fn malformed(page_id: impl Into<String>, field: &'static str) -> Self {
        ReminderError::MalformedRecord {
            page_id: page_id.into(),
            field,
        }
    }
}

/// Result type alias for reminder operations
pub type ReminderResult<T> = Result<T, ReminderError>;
