//! Rust client for the FinLink financial data aggregation APIs.
//!
//! FinLink links your customers' bank accounts to your application: you create
//! a *connection* to a provider, FinLink synchronizes it in the background,
//! and this crate polls the connection status for you until the
//! synchronization reaches a terminal stage.
//!
//! # Usage
//!
//! ## Initialize a new `FinLinkClient`
//!
//! Create a new [`FinLinkClient`](crate::client::FinLinkClient) and provide
//! your application id and secret.
//!
//! ```rust,no_run
//! use finlink_rust::{client::AppCredentials, FinLinkClient};
//!
//! let client = FinLinkClient::new(AppCredentials::new("some-app-id", "some-app-secret"));
//! ```
//!
//! By default, a `FinLinkClient` connects to the Live environment. To connect
//! to the FinLink Sandbox, use
//! [`with_environment(Environment::Sandbox)`](crate::client::FinLinkClientBuilder::with_environment).
//!
//! ## Create a connection and poll it until it finishes
//!
//! The [`ConnectionFetcher`](crate::fetcher::ConnectionFetcher) issues the
//! request and then keeps checking the connection status in the background,
//! reporting progress to your
//! [`ConnectionFetchingDelegate`](crate::fetcher::ConnectionFetchingDelegate):
//!
//! ```rust,no_run
//! # use finlink_rust::{
//! #     apis::connections::{Connection, ConsentRequest, CreateConnectionRequestBuilder},
//! #     client::AppCredentials,
//! #     fetcher::{ConnectionFetcher, ConnectionFetchingDelegate},
//! #     Error, FinLinkClient,
//! # };
//! # use std::sync::Arc;
//! #
//! struct PrintingDelegate;
//!
//! impl ConnectionFetchingDelegate for PrintingDelegate {
//!     fn interactive_input_requested(&self, connection: Connection) {
//!         println!("interactive input requested for {}", connection.id);
//!     }
//!
//!     fn connection_stage_did_change(&self, connection: Connection) {
//!         println!("connection {} is now in stage {}", connection.id, connection.stage());
//!     }
//!
//!     fn successfully_finished_fetching(&self, connection: Connection) {
//!         println!("connection {} finished fetching", connection.id);
//!     }
//!
//!     fn failed_to_fetch(
//!         &self,
//!         _connection: Option<Connection>,
//!         _connection_secret: Option<String>,
//!         message: String,
//!         _system_description: Option<String>,
//!     ) {
//!         eprintln!("fetching failed: {}", message);
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let client = FinLinkClient::new(AppCredentials::new("some-app-id", "some-app-secret"));
//! let fetcher = ConnectionFetcher::new(client, Arc::new(PrintingDelegate));
//!
//! let request = CreateConnectionRequestBuilder::default()
//!     .country_code("SE".to_string())
//!     .provider_code("fake_bank_xf".to_string())
//!     .consent(ConsentRequest {
//!         scopes: vec!["account_details".to_string()],
//!         from_date: None,
//!     })
//!     .build()
//!     .unwrap();
//!
//! let (connection, handle) = fetcher.create_connection(&request).await?;
//! println!("created connection {}", connection.id);
//!
//! // Wait for the delegate to receive the terminal outcome
//! handle.wait().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Connections established over OAuth
//!
//! When the connection is established out-of-band (e.g. the user authorized it
//! through a web OAuth redirect), start polling directly from the connection
//! secret returned in the redirect:
//!
//! ```rust,no_run
//! # use finlink_rust::fetcher::ConnectionFetcher;
//! # let fetcher: ConnectionFetcher = unreachable!();
//! let handle = fetcher.handle_oauth_connection("some-connection-secret");
//! ```

#![deny(missing_debug_implementations)]
#![forbid(unsafe_code)]

pub mod apis;
pub mod client;
mod common;
pub mod error;
pub mod fetcher;
mod middlewares;

pub use client::FinLinkClient;
pub use error::Error;
pub use fetcher::{ConnectionFetcher, ConnectionFetchingDelegate, PollOptions, PollingHandle};
