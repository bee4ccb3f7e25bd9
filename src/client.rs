//! Module containing the main FinLink API client.

use crate::{
    apis::{connections::ConnectionsApi, ClientInner},
    common::{DEFAULT_API_URL, DEFAULT_SANDBOX_API_URL},
    middlewares::{auth_headers::AuthHeadersMiddleware, error_handling::ErrorHandlingMiddleware},
};
use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_tracing::TracingMiddleware;
use secrecy::Secret;
use std::sync::Arc;

/// Client for FinLink public APIs.
#[derive(Debug, Clone)]
pub struct FinLinkClient {
    /// Connections APIs client.
    pub connections: ConnectionsApi,
}

impl FinLinkClient {
    /// Builds a new [`FinLinkClient`](crate::client::FinLinkClient) with the default configuration.
    pub fn new(credentials: AppCredentials) -> FinLinkClient {
        FinLinkClientBuilder::new(credentials).build()
    }

    /// Returns a new builder to configure a new [`FinLinkClient`](crate::client::FinLinkClient).
    pub fn builder(credentials: AppCredentials) -> FinLinkClientBuilder {
        FinLinkClientBuilder::new(credentials)
    }
}

/// Application credentials identifying a FinLink client app.
///
/// These are sent as headers with every request.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub secret: Secret<String>,
}

impl AppCredentials {
    pub fn new(app_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            secret: Secret::new(secret.into()),
        }
    }
}

/// FinLink environment the client connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Live,
    Sandbox,
    Custom { api_url: Url },
}

impl Environment {
    /// Returns an [`Environment`] pointing all requests at the given URL.
    pub fn from_single_url(url: &Url) -> Self {
        Environment::Custom {
            api_url: url.clone(),
        }
    }

    /// Base URL for API requests in this environment.
    pub fn api_url(&self) -> Url {
        match self {
            Environment::Live => Url::parse(DEFAULT_API_URL).unwrap(),
            Environment::Sandbox => Url::parse(DEFAULT_SANDBOX_API_URL).unwrap(),
            Environment::Custom { api_url } => api_url.clone(),
        }
    }
}

/// Builder for a [`FinLinkClient`](crate::client::FinLinkClient).
#[derive(Debug)]
pub struct FinLinkClientBuilder {
    client: reqwest::Client,
    environment: Environment,
    credentials: AppCredentials,
}

impl FinLinkClientBuilder {
    /// Creates a new builder to configure a [`FinLinkClient`](crate::client::FinLinkClient).
    pub fn new(credentials: AppCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            environment: Environment::Live,
            credentials,
        }
    }

    /// Consumes the builder and builds a new [`FinLinkClient`](crate::client::FinLinkClient).
    pub fn build(self) -> FinLinkClient {
        let inner = Arc::new(ClientInner {
            client: build_client_with_middleware(self.client, self.credentials),
            environment: self.environment,
        });

        FinLinkClient {
            connections: ConnectionsApi::new(inner),
        }
    }

    /// Sets a specific reqwest [`Client`](reqwest::Client) to use.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Sets the [`Environment`] to connect to.
    ///
    /// Defaults to [`Environment::Live`].
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

fn build_client_with_middleware(
    client: reqwest::Client,
    credentials: AppCredentials,
) -> ClientWithMiddleware {
    reqwest_middleware::ClientBuilder::new(client)
        .with(TracingMiddleware::default())
        .with(ErrorHandlingMiddleware)
        .with(AuthHeadersMiddleware::new(credentials))
        .build()
}
