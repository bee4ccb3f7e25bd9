//! Clients for the various FinLink APIs.

use crate::client::Environment;
use reqwest_middleware::ClientWithMiddleware;
use std::fmt::{Debug, Formatter};

pub mod connections;

pub(crate) struct ClientInner {
    pub(crate) client: ClientWithMiddleware,
    pub(crate) environment: Environment,
}

impl Debug for ClientInner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientInner")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}
