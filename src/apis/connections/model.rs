use chrono::{DateTime, NaiveDate, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// A connection between a customer and a financial data provider.
///
/// A fresh `Connection` is decoded from every response of the connection
/// endpoints; the SDK never mutates one. The [`secret`](Connection::secret)
/// is stable for the lifetime of the connection and is the sole key used to
/// re-fetch its status.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawConnection")]
pub struct Connection {
    pub id: String,
    pub country_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub daily_refresh: bool,
    pub show_consent_confirmation: Option<bool>,
    pub consent_types: Option<Vec<String>>,
    pub consent_given_at: Option<DateTime<Utc>>,
    pub last_attempt: Attempt,
    /// Raw textual form of the `last_attempt` response field.
    ///
    /// Only meaningful as debug context on failed connections; do not parse it.
    pub last_attempt_response: Option<String>,
    pub holder_info: Option<HolderInfo>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub next_refresh_possible_at: Option<DateTime<Utc>>,
    pub provider_id: String,
    pub provider_code: String,
    pub provider_name: String,
    /// Opaque token identifying this connection for status polling.
    pub secret: String,
    pub status: ConnectionStatus,
    pub store_credentials: bool,
    pub customer_id: String,
}

impl Connection {
    /// Coarse lifecycle phase of the most recent synchronization attempt.
    ///
    /// Returns [`Stage::Unknown`] when the last attempt carries no stage.
    pub fn stage(&self) -> Stage {
        self.last_attempt
            .last_stage
            .as_ref()
            .map(|stage| stage.name)
            .unwrap_or(Stage::Unknown)
    }

    /// Human readable failure message of the last attempt, if any.
    pub fn fail_message(&self) -> Option<&str> {
        self.last_attempt.fail_message.as_deref()
    }
}

/// Wire form of a [`Connection`].
///
/// `last_attempt` is kept as a raw JSON value so that its textual form can be
/// preserved next to the decoded [`Attempt`].
#[derive(Deserialize)]
struct RawConnection {
    id: String,
    country_code: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    daily_refresh: bool,
    show_consent_confirmation: Option<bool>,
    consent_types: Option<Vec<String>>,
    consent_given_at: Option<DateTime<Utc>>,
    last_attempt: Value,
    holder_info: Option<HolderInfo>,
    last_success_at: Option<DateTime<Utc>>,
    next_refresh_possible_at: Option<DateTime<Utc>>,
    provider_id: String,
    provider_code: String,
    provider_name: String,
    secret: String,
    status: ConnectionStatus,
    store_credentials: bool,
    customer_id: String,
}

impl TryFrom<RawConnection> for Connection {
    type Error = serde_json::Error;

    fn try_from(raw: RawConnection) -> Result<Self, Self::Error> {
        let last_attempt_response = match &raw.last_attempt {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => Some(raw.last_attempt.to_string()),
            _ => None,
        };
        let last_attempt: Attempt = serde_json::from_value(raw.last_attempt)?;

        Ok(Connection {
            id: raw.id,
            country_code: raw.country_code,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            daily_refresh: raw.daily_refresh,
            show_consent_confirmation: raw.show_consent_confirmation,
            consent_types: raw.consent_types,
            consent_given_at: raw.consent_given_at,
            last_attempt,
            last_attempt_response,
            holder_info: raw.holder_info,
            last_success_at: raw.last_success_at,
            next_refresh_possible_at: raw.next_refresh_possible_at,
            provider_id: raw.provider_id,
            provider_code: raw.provider_code,
            provider_name: raw.provider_name,
            secret: raw.secret,
            status: raw.status,
            store_credentials: raw.store_credentials,
            customer_id: raw.customer_id,
        })
    }
}

/// Summary of the most recent synchronization try for a connection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Attempt {
    pub id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub finished: Option<bool>,
    pub partial: Option<bool>,
    pub success: Option<bool>,
    pub fail_at: Option<DateTime<Utc>>,
    pub fail_message: Option<String>,
    pub fail_error_class: Option<String>,
    pub last_stage: Option<AttemptStage>,
}

/// The stage a synchronization attempt last reported.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttemptStage {
    pub name: Stage,
    pub created_at: Option<DateTime<Utc>>,
    /// Names of the credential fields the provider is asking for interactively.
    pub interactive_fields_names: Option<Vec<String>>,
    /// Provider-supplied HTML to present alongside the interactive fields.
    pub interactive_html: Option<String>,
}

/// Coarse lifecycle phase of a synchronization attempt.
///
/// Only [`Stage::Interactive`] and [`Stage::Finish`] drive control flow in the
/// poller; every other variant (including stages added server-side after this
/// crate was released, which decode as [`Stage::Unknown`]) means the attempt
/// is still in progress.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Connect,
    Interactive,
    FetchHolderInfo,
    FetchAccounts,
    FetchRecent,
    FetchFull,
    Disconnect,
    Finish,
    #[serde(other)]
    Unknown,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Connect => "connect",
            Stage::Interactive => "interactive",
            Stage::FetchHolderInfo => "fetch_holder_info",
            Stage::FetchAccounts => "fetch_accounts",
            Stage::FetchRecent => "fetch_recent",
            Stage::FetchFull => "fetch_full",
            Stage::Disconnect => "disconnect",
            Stage::Finish => "finish",
            Stage::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of a connection.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Active,
    Inactive,
    Disabled,
    #[serde(other)]
    Unknown,
}

/// Information about the account holder, when the provider exposes it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HolderInfo {
    pub names: Option<Vec<String>>,
    pub emails: Option<Vec<String>>,
    pub phone_numbers: Option<Vec<String>>,
}

/// Consent given by the end user when establishing a connection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConsentRequest {
    pub scopes: Vec<String>,
    pub from_date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
pub struct CreateConnectionRequest {
    pub country_code: String,
    pub provider_code: String,
    pub consent: ConsentRequest,
    /// Provider credentials, in the free-form shape the provider expects.
    #[builder(default)]
    pub credentials: Option<Value>,
    #[builder(default)]
    pub daily_refresh: Option<bool>,
    #[builder(default)]
    pub store_credentials: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateConnectionStatusRequest {
    pub status: ConnectionStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
pub struct ReconnectConnectionRequest {
    pub credentials: Value,
    #[builder(default)]
    pub consent: Option<ConsentRequest>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshConnectionRequest {
    pub daily_refresh: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InteractiveCredentialsRequest {
    /// Values for the fields listed in the attempt's `interactive_fields_names`.
    pub credentials: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connection_json(last_attempt: Value) -> Value {
        json!({
            "id": "connection-id",
            "country_code": "SE",
            "created_at": "2023-02-01T10:00:00Z",
            "updated_at": "2023-02-01T10:01:30Z",
            "daily_refresh": false,
            "show_consent_confirmation": true,
            "consent_types": ["account_details"],
            "consent_given_at": "2023-02-01T10:00:00Z",
            "last_attempt": last_attempt,
            "holder_info": {
                "names": ["Jane Holder"],
                "emails": ["jane@holder.test"],
                "phone_numbers": null
            },
            "last_success_at": null,
            "next_refresh_possible_at": null,
            "provider_id": "provider-id",
            "provider_code": "fake_bank_xf",
            "provider_name": "Fake Bank",
            "secret": "connection-secret",
            "status": "active",
            "store_credentials": true,
            "customer_id": "customer-id"
        })
    }

    #[test]
    fn deserializes_connection() {
        let connection: Connection = serde_json::from_value(connection_json(json!({
            "id": "attempt-id",
            "finished": false,
            "last_stage": { "name": "fetch_accounts" }
        })))
        .unwrap();

        assert_eq!(connection.id, "connection-id");
        assert_eq!(connection.secret, "connection-secret");
        assert_eq!(connection.status, ConnectionStatus::Active);
        assert_eq!(connection.stage(), Stage::FetchAccounts);
        assert_eq!(connection.fail_message(), None);
        assert_eq!(
            connection.holder_info,
            Some(HolderInfo {
                names: Some(vec!["Jane Holder".to_string()]),
                emails: Some(vec!["jane@holder.test".to_string()]),
                phone_numbers: None
            })
        );
    }

    #[test]
    fn attempt_with_no_fields_still_decodes() {
        let connection: Connection =
            serde_json::from_value(connection_json(json!({}))).unwrap();

        assert_eq!(connection.last_attempt.id, None);
        assert_eq!(connection.stage(), Stage::Unknown);
        assert_eq!(connection.fail_message(), None);
    }

    #[test]
    fn stage_defaults_to_unknown_without_last_stage() {
        let connection: Connection = serde_json::from_value(connection_json(json!({
            "id": "attempt-id"
        })))
        .unwrap();

        assert_eq!(connection.stage(), Stage::Unknown);
    }

    #[test]
    fn unrecognized_stage_names_decode_as_unknown() {
        let connection: Connection = serde_json::from_value(connection_json(json!({
            "id": "attempt-id",
            "last_stage": { "name": "fetch_everything_else" }
        })))
        .unwrap();

        assert_eq!(connection.stage(), Stage::Unknown);
    }

    #[test]
    fn unrecognized_status_decodes_as_unknown() {
        let mut body = connection_json(json!({ "id": "attempt-id" }));
        body["status"] = json!("paused");

        let connection: Connection = serde_json::from_value(body).unwrap();

        assert_eq!(connection.status, ConnectionStatus::Unknown);
    }

    #[test]
    fn preserves_raw_last_attempt_as_string() {
        let connection: Connection = serde_json::from_value(connection_json(json!({
            "id": "attempt-id",
            "fail_message": "Invalid credentials",
            "last_stage": { "name": "finish" }
        })))
        .unwrap();

        let raw = connection.last_attempt_response.unwrap();
        assert!(raw.contains("Invalid credentials"));
        assert_eq!(connection.last_attempt.fail_message.as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn create_connection_request_builder() {
        let request = CreateConnectionRequestBuilder::default()
            .country_code("SE".to_string())
            .provider_code("fake_bank_xf".to_string())
            .consent(ConsentRequest {
                scopes: vec!["account_details".to_string()],
                from_date: None,
            })
            .credentials(Some(json!({ "login": "user", "password": "pass" })))
            .build()
            .unwrap();

        assert_eq!(request.country_code, "SE");
        assert_eq!(request.daily_refresh, None);
        assert_eq!(request.store_credentials, None);
    }
}
