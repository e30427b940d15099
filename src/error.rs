use std::fmt::Display;

use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, Request};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that are fatal to the request that produced them.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Construct a `404 Not Found` error for the described resource.
    pub fn not_found(what: impl Display) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    /// The HTTP status this error should produce.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let uri = req.uri();
        if status.code >= 500 {
            error!("{uri}: {self}");
        } else {
            warn!("{uri}: {self}");
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(Error::not_found("Voter 4").status(), Status::NotFound);
        assert_eq!(Error::not_found("Voter 4").to_string(), "Voter 4 not found");
        let conflict = Error::Status(Status::Conflict, "duplicate".to_string());
        assert_eq!(conflict.status(), Status::Conflict);
    }
}
