use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::admission::AdmissionError;
use crate::directory::DirectoryError;
use crate::ledger::LedgerError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("Not found: {what}"))
    }

    /// The HTTP status this error should be reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Ledger(err) => err.status(),
            Self::Directory(err) => err.status(),
            Self::Status(status, _) => *status,
        }
    }
}

impl From<AdmissionError> for Error {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Ledger(err) => Self::Ledger(err),
            AdmissionError::Directory(err) => Self::Directory(err),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.class().is_server_error() {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::mongodb::Id;

    #[test]
    fn transient_failures_are_distinct_from_internal_ones() {
        let unavailable = Error::from(LedgerError::Timeout);
        assert_eq!(unavailable.status(), Status::ServiceUnavailable);

        let corrupt = Error::from(LedgerError::Corrupt(format!("vote {}", Id::new())));
        assert_eq!(corrupt.status(), Status::InternalServerError);
    }

    #[test]
    fn not_found_carries_its_subject() {
        let err = Error::not_found("Election with ID 'abc'".to_string());
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.to_string(), "Not found: Election with ID 'abc'");
    }
}
