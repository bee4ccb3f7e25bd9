//! Standard errors used by all functions in the crate.

use std::fmt;

/// Error collecting all possible failures of the FinLink client.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Reqwest error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    /// Error returned by a FinLink API endpoint.
    #[error("{0}")]
    ApiError(#[from] ApiError),
    /// Catch-all variant for unexpected errors.
    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<reqwest_middleware::Error> for Error {
    fn from(e: reqwest_middleware::Error) -> Self {
        match e {
            reqwest_middleware::Error::Reqwest(e) => Error::HttpError(e),
            reqwest_middleware::Error::Middleware(e) => {
                e.downcast::<Error>().unwrap_or_else(Error::Other)
            }
        }
    }
}

impl From<Error> for reqwest_middleware::Error {
    fn from(e: Error) -> Self {
        reqwest_middleware::Error::Middleware(e.into())
    }
}

/// FinLink HTTP APIs error.
#[derive(thiserror::Error, Debug)]
pub struct ApiError {
    /// A unique identifier for this class of error (e.g. `ConnectionNotFound`).
    pub class: String,
    /// Human readable explanation of the error.
    pub message: String,
    /// HTTP status returned by the server.
    pub status: u16,
    /// The FinLink request identifier, useful when contacting support.
    pub request_id: Option<String>,
    /// URL of a webpage with more information on the error.
    pub documentation_url: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FinLink HTTP error {}: {}", self.status, self.class)?;

        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }

        if let Some(ref request_id) = self.request_id {
            write!(f, "\nRequest ID: {}", request_id)?;
        }

        if let Some(ref documentation_url) = self.documentation_url {
            write!(f, "\nSee: {}", documentation_url)?;
        }

        Ok(())
    }
}
