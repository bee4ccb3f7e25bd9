//! Connection lifecycle orchestration: issue a connection request, then poll
//! its status until a terminal or interactive stage is reached.

use crate::{
    apis::connections::{
        Connection, CreateConnectionRequest, InteractiveCredentialsRequest,
        ReconnectConnectionRequest, RefreshConnectionRequest, Stage, UpdateConnectionStatusRequest,
    },
    Error, FinLinkClient,
};
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
    time::Duration,
};
use tokio::task::JoinHandle;

/// Callbacks through which a [`ConnectionFetcher`] reports the progress of a
/// polling sequence.
///
/// Every polling sequence ends with exactly one of
/// [`interactive_input_requested`](ConnectionFetchingDelegate::interactive_input_requested),
/// [`successfully_finished_fetching`](ConnectionFetchingDelegate::successfully_finished_fetching)
/// or [`failed_to_fetch`](ConnectionFetchingDelegate::failed_to_fetch), unless
/// it is stopped through its [`PollingHandle`].
pub trait ConnectionFetchingDelegate: Send + Sync + 'static {
    /// Fire-and-forget diagnostic sink.
    fn log_message(&self, _message: &str) {}

    /// The provider is asking for additional interactive input (e.g. an OTP).
    ///
    /// Polling stops; submit the requested credentials with
    /// [`ConnectionFetcher::interactive_connection`] to resume the flow.
    fn interactive_input_requested(&self, connection: Connection);

    /// The connection moved to a new in-progress stage. Polling continues.
    fn connection_stage_did_change(&self, connection: Connection);

    /// The connection finished fetching successfully. Polling stops.
    fn successfully_finished_fetching(&self, connection: Connection);

    /// The polling sequence ended in failure.
    ///
    /// Carries the last fetched connection when the remote system reported the
    /// failure, or only the secret when the status check itself failed.
    fn failed_to_fetch(
        &self,
        connection: Option<Connection>,
        connection_secret: Option<String>,
        message: String,
        system_description: Option<String>,
    );
}

/// Options to configure the polling behaviour of a [`ConnectionFetcher`].
///
/// The default checks the connection status every 3 seconds and tolerates up
/// to 10 consecutive transient network failures.
#[derive(Debug, Clone)]
pub struct PollOptions {
    interval: Duration,
    max_transient_retries: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_transient_retries: 10,
        }
    }
}

impl PollOptions {
    /// Sets the delay between two consecutive status checks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets how many consecutive connection-lost/timeout failures are retried
    /// before the sequence is reported as failed.
    pub fn with_max_transient_retries(mut self, max_transient_retries: u32) -> Self {
        self.max_transient_retries = max_transient_retries;
        self
    }
}

/// Handle on a single running polling sequence.
///
/// Dropping the handle detaches the sequence; it keeps running until a
/// terminal or interactive stage is reached or its retry budget is exhausted.
#[derive(Debug)]
pub struct PollingHandle {
    connection_secret: String,
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// The secret of the connection this sequence is polling.
    pub fn connection_secret(&self) -> &str {
        &self.connection_secret
    }

    /// Stops the polling sequence. No further delegate callbacks are made.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Returns `true` once the sequence has ended or has been stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits until the polling sequence ends.
    pub async fn wait(self) {
        // The only join error here is an abort through `stop`
        let _ = self.task.await;
    }
}

/// Drives the post-request lifecycle of bank connections.
///
/// Each entry point issues one typed request and, on success, starts a single
/// polling sequence on a background task. Progress and the terminal outcome
/// are reported through the [`ConnectionFetchingDelegate`]; the entry points
/// themselves only return the initial response.
///
/// Sequences for different connections run independently, each with its own
/// transient-retry budget.
#[derive(Clone)]
pub struct ConnectionFetcher {
    client: FinLinkClient,
    delegate: Arc<dyn ConnectionFetchingDelegate>,
    options: PollOptions,
}

impl Debug for ConnectionFetcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFetcher")
            .field("client", &self.client)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ConnectionFetcher {
    /// Creates a new fetcher with the default [`PollOptions`].
    pub fn new(client: FinLinkClient, delegate: Arc<dyn ConnectionFetchingDelegate>) -> Self {
        Self {
            client,
            delegate,
            options: PollOptions::default(),
        }
    }

    /// Replaces the [`PollOptions`] used for all sequences started by this fetcher.
    pub fn with_poll_options(mut self, options: PollOptions) -> Self {
        self.options = options;
        self
    }

    /// Creates a new connection and begins polling its status.
    pub async fn create_connection(
        &self,
        request: &CreateConnectionRequest,
    ) -> Result<(Connection, PollingHandle), Error> {
        let connection = self.client.connections.create(request).await?;
        Ok(self.poll_after_request(connection))
    }

    /// Updates the lifecycle status of a connection and begins polling it.
    pub async fn update_connection_status(
        &self,
        connection_id: &str,
        secret: &str,
        request: &UpdateConnectionStatusRequest,
    ) -> Result<(Connection, PollingHandle), Error> {
        let connection = self
            .client
            .connections
            .update_status(connection_id, secret, request)
            .await?;
        Ok(self.poll_after_request(connection))
    }

    /// Reconnects an existing connection and begins polling its status.
    pub async fn reconnect_connection(
        &self,
        secret: &str,
        request: &ReconnectConnectionRequest,
    ) -> Result<(Connection, PollingHandle), Error> {
        let connection = self.client.connections.reconnect(secret, request).await?;
        Ok(self.poll_after_request(connection))
    }

    /// Triggers a new synchronization attempt and begins polling its status.
    pub async fn refresh_connection(
        &self,
        secret: &str,
        request: Option<&RefreshConnectionRequest>,
    ) -> Result<(Connection, PollingHandle), Error> {
        let connection = self.client.connections.refresh(secret, request).await?;
        Ok(self.poll_after_request(connection))
    }

    /// Submits interactive credentials and resumes polling the connection.
    pub async fn interactive_connection(
        &self,
        secret: &str,
        request: &InteractiveCredentialsRequest,
    ) -> Result<(Connection, PollingHandle), Error> {
        let connection = self
            .client
            .connections
            .submit_interactive(secret, request)
            .await?;
        Ok(self.poll_after_request(connection))
    }

    /// Begins polling a connection established out-of-band (e.g. through a web
    /// OAuth redirect), starting with an immediate status check.
    pub fn handle_oauth_connection(&self, connection_secret: &str) -> PollingHandle {
        self.start_polling(connection_secret.to_string(), FirstCheck::Immediate)
    }

    fn poll_after_request(&self, connection: Connection) -> (Connection, PollingHandle) {
        self.delegate.log_message(&format!(
            "{}: status check scheduled in {}s",
            connection.provider_code,
            self.options.interval.as_secs()
        ));
        let handle = self.start_polling(connection.secret.clone(), FirstCheck::Delayed);
        (connection, handle)
    }

    fn start_polling(&self, connection_secret: String, first_check: FirstCheck) -> PollingHandle {
        let task = tokio::spawn(poll_connection(
            self.client.clone(),
            connection_secret.clone(),
            self.delegate.clone(),
            self.options.clone(),
            first_check,
        ));

        PollingHandle {
            connection_secret,
            task,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirstCheck {
    Immediate,
    Delayed,
}

/// A single polling sequence: strictly sequential status checks for one
/// connection, with an owned transient-retry counter.
async fn poll_connection(
    client: FinLinkClient,
    connection_secret: String,
    delegate: Arc<dyn ConnectionFetchingDelegate>,
    options: PollOptions,
    first_check: FirstCheck,
) {
    let mut transient_retries: u32 = 0;

    if first_check == FirstCheck::Delayed {
        tokio::time::sleep(options.interval).await;
    }

    loop {
        delegate.log_message("checking connection status");

        match client.connections.show(&connection_secret).await {
            Ok(connection) => {
                transient_retries = 0;

                match connection.stage() {
                    Stage::Interactive => {
                        delegate.log_message("connection requested interactive input");
                        delegate.interactive_input_requested(connection);
                        return;
                    }
                    Stage::Finish => {
                        match connection.fail_message() {
                            Some(message) => {
                                let message = message.to_string();
                                let system_description = connection.last_attempt_response.clone();
                                delegate.failed_to_fetch(
                                    Some(connection),
                                    None,
                                    message,
                                    system_description,
                                );
                            }
                            None => delegate.successfully_finished_fetching(connection),
                        }
                        return;
                    }
                    stage => {
                        delegate.log_message(&format!(
                            "connection in stage {}, next status check in {}s",
                            stage,
                            options.interval.as_secs()
                        ));
                        delegate.connection_stage_did_change(connection);
                        tokio::time::sleep(options.interval).await;
                    }
                }
            }
            Err(error)
                if transient_retries < options.max_transient_retries && is_transient(&error) =>
            {
                transient_retries += 1;
                delegate.log_message(&format!(
                    "connection lost or timed out, retrying ({}/{})",
                    transient_retries, options.max_transient_retries
                ));
                tokio::time::sleep(options.interval).await;
            }
            Err(error) => {
                delegate.log_message("status check failed");
                delegate.failed_to_fetch(None, Some(connection_secret), error.to_string(), None);
                return;
            }
        }
    }
}

/// Whether a status check failure may be retried.
///
/// Only network blips qualify: the connection dropping mid-request or the
/// request timing out. API errors and decode errors are always fatal.
fn is_transient(error: &Error) -> bool {
    match error {
        Error::HttpError(e) => e.is_timeout() || e.is_connect(),
        Error::ApiError(_) | Error::Other(_) => false,
    }
}
