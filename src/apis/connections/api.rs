use crate::{
    apis::{
        connections::{
            Connection, CreateConnectionRequest, InteractiveCredentialsRequest,
            ReconnectConnectionRequest, RefreshConnectionRequest, UpdateConnectionStatusRequest,
        },
        ClientInner,
    },
    common::CONNECTION_SECRET_HEADER,
    Error,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use urlencoding::encode;

/// FinLink Connections APIs client.
#[derive(Clone, Debug)]
pub struct ConnectionsApi {
    inner: Arc<ClientInner>,
}

impl ConnectionsApi {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Creates a new connection to a provider.
    #[tracing::instrument(
        name = "Create Connection",
        skip(self, request),
        fields(
            country_code = %request.country_code,
            provider_code = %request.provider_code,
        )
    )]
    pub async fn create(&self, request: &CreateConnectionRequest) -> Result<Connection, Error> {
        let res: DataResponse<_> = self
            .inner
            .client
            .post(
                self.inner
                    .environment
                    .api_url()
                    .join("/v1/connections")
                    .unwrap(),
            )
            .json(&DataRequest { data: request })
            .send()
            .await?
            .json()
            .await?;

        Ok(res.data)
    }

    /// Updates the lifecycle status of an existing connection.
    #[tracing::instrument(name = "Update Connection Status", skip(self, secret, request))]
    pub async fn update_status(
        &self,
        connection_id: &str,
        secret: &str,
        request: &UpdateConnectionStatusRequest,
    ) -> Result<Connection, Error> {
        let res: DataResponse<_> = self
            .inner
            .client
            .put(
                self.inner
                    .environment
                    .api_url()
                    .join(&format!("/v1/connections/{}", encode(connection_id)))
                    .unwrap(),
            )
            .header(CONNECTION_SECRET_HEADER, secret)
            .json(&DataRequest { data: request })
            .send()
            .await?
            .json()
            .await?;

        Ok(res.data)
    }

    /// Reconnects a connection whose credentials are no longer valid.
    #[tracing::instrument(name = "Reconnect Connection", skip_all)]
    pub async fn reconnect(
        &self,
        secret: &str,
        request: &ReconnectConnectionRequest,
    ) -> Result<Connection, Error> {
        let res: DataResponse<_> = self
            .inner
            .client
            .put(
                self.inner
                    .environment
                    .api_url()
                    .join("/v1/connection/reconnect")
                    .unwrap(),
            )
            .header(CONNECTION_SECRET_HEADER, secret)
            .json(&DataRequest { data: request })
            .send()
            .await?
            .json()
            .await?;

        Ok(res.data)
    }

    /// Triggers a new synchronization attempt for a connection.
    #[tracing::instrument(name = "Refresh Connection", skip_all)]
    pub async fn refresh(
        &self,
        secret: &str,
        request: Option<&RefreshConnectionRequest>,
    ) -> Result<Connection, Error> {
        let res: DataResponse<_> = self
            .inner
            .client
            .put(
                self.inner
                    .environment
                    .api_url()
                    .join("/v1/connection/refresh")
                    .unwrap(),
            )
            .header(CONNECTION_SECRET_HEADER, secret)
            .json(&DataRequest {
                data: request.unwrap_or(&RefreshConnectionRequest { daily_refresh: None }),
            })
            .send()
            .await?
            .json()
            .await?;

        Ok(res.data)
    }

    /// Submits the credentials the provider asked for interactively.
    #[tracing::instrument(name = "Submit Interactive Credentials", skip_all)]
    pub async fn submit_interactive(
        &self,
        secret: &str,
        request: &InteractiveCredentialsRequest,
    ) -> Result<Connection, Error> {
        let res: DataResponse<_> = self
            .inner
            .client
            .put(
                self.inner
                    .environment
                    .api_url()
                    .join("/v1/connection/interactive")
                    .unwrap(),
            )
            .header(CONNECTION_SECRET_HEADER, secret)
            .json(&DataRequest { data: request })
            .send()
            .await?
            .json()
            .await?;

        Ok(res.data)
    }

    /// Fetches the current state of the connection identified by `secret`.
    #[tracing::instrument(name = "Show Connection", skip_all)]
    pub async fn show(&self, secret: &str) -> Result<Connection, Error> {
        let res: DataResponse<_> = self
            .inner
            .client
            .get(
                self.inner
                    .environment
                    .api_url()
                    .join("/v1/connection")
                    .unwrap(),
            )
            .header(CONNECTION_SECRET_HEADER, secret)
            .send()
            .await?
            .json()
            .await?;

        Ok(res.data)
    }
}

/// Envelope wrapping every request body sent to FinLink.
#[derive(Serialize)]
struct DataRequest<'a, T> {
    data: &'a T,
}

/// Envelope wrapping every response body returned by FinLink.
#[derive(Deserialize)]
struct DataResponse<T> {
    data: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        apis::connections::{ConnectionStatus, ConsentRequest, Stage},
        client::Environment,
        middlewares::error_handling::ErrorHandlingMiddleware,
    };
    use reqwest::Url;
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn mock_client_and_server() -> (ConnectionsApi, MockServer) {
        let mock_server = MockServer::start().await;

        let inner = ClientInner {
            client: reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
                .with(ErrorHandlingMiddleware)
                .build(),
            environment: Environment::from_single_url(&Url::parse(&mock_server.uri()).unwrap()),
        };

        (ConnectionsApi::new(Arc::new(inner)), mock_server)
    }

    fn connection_response(stage: &str) -> serde_json::Value {
        json!({
            "data": {
                "id": "connection-id",
                "country_code": "SE",
                "created_at": "2023-02-01T10:00:00Z",
                "updated_at": "2023-02-01T10:01:30Z",
                "daily_refresh": false,
                "last_attempt": {
                    "id": "attempt-id",
                    "last_stage": { "name": stage }
                },
                "provider_id": "provider-id",
                "provider_code": "fake_bank_xf",
                "provider_name": "Fake Bank",
                "secret": "connection-secret",
                "status": "active",
                "store_credentials": true,
                "customer_id": "customer-id"
            }
        })
    }

    #[tokio::test]
    async fn create() {
        let (api, mock_server) = mock_client_and_server().await;

        Mock::given(method("POST"))
            .and(path("/v1/connections"))
            .and(body_partial_json(json!({
                "data": {
                    "country_code": "SE",
                    "provider_code": "fake_bank_xf"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(connection_response("start")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let connection = api
            .create(&CreateConnectionRequest {
                country_code: "SE".to_string(),
                provider_code: "fake_bank_xf".to_string(),
                consent: ConsentRequest {
                    scopes: vec!["account_details".to_string()],
                    from_date: None,
                },
                credentials: Some(json!({ "login": "user", "password": "pass" })),
                daily_refresh: None,
                store_credentials: None,
            })
            .await
            .unwrap();

        assert_eq!(connection.id, "connection-id");
        assert_eq!(connection.secret, "connection-secret");
        assert_eq!(connection.stage(), Stage::Start);
    }

    #[tokio::test]
    async fn create_api_error() {
        let (api, mock_server) = mock_client_and_server().await;

        Mock::given(method("POST"))
            .and(path("/v1/connections"))
            .respond_with(ResponseTemplate::new(406).set_body_json(json!({
                "error": {
                    "class": "ProviderNotFound",
                    "message": "Provider could not be found"
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let res = api
            .create(&CreateConnectionRequest {
                country_code: "SE".to_string(),
                provider_code: "missing".to_string(),
                consent: ConsentRequest {
                    scopes: vec![],
                    from_date: None,
                },
                credentials: None,
                daily_refresh: None,
                store_credentials: None,
            })
            .await;

        assert!(
            matches!(res, Err(Error::ApiError(ref e)) if e.status == 406 && e.class == "ProviderNotFound")
        );
    }

    #[tokio::test]
    async fn update_status() {
        let (api, mock_server) = mock_client_and_server().await;

        Mock::given(method("PUT"))
            .and(path("/v1/connections/connection-id"))
            .and(header(CONNECTION_SECRET_HEADER, "connection-secret"))
            .and(body_partial_json(json!({
                "data": { "status": "inactive" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(connection_response("start")))
            .expect(1)
            .mount(&mock_server)
            .await;

        api.update_status(
            "connection-id",
            "connection-secret",
            &UpdateConnectionStatusRequest {
                status: ConnectionStatus::Inactive,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn reconnect() {
        let (api, mock_server) = mock_client_and_server().await;

        Mock::given(method("PUT"))
            .and(path("/v1/connection/reconnect"))
            .and(header(CONNECTION_SECRET_HEADER, "connection-secret"))
            .and(body_partial_json(json!({
                "data": { "credentials": { "login": "user" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(connection_response("connect")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let connection = api
            .reconnect(
                "connection-secret",
                &ReconnectConnectionRequest {
                    credentials: json!({ "login": "user" }),
                    consent: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(connection.stage(), Stage::Connect);
    }

    #[tokio::test]
    async fn refresh_without_params_sends_empty_data() {
        let (api, mock_server) = mock_client_and_server().await;

        Mock::given(method("PUT"))
            .and(path("/v1/connection/refresh"))
            .and(header(CONNECTION_SECRET_HEADER, "connection-secret"))
            .and(body_partial_json(json!({ "data": {} })))
            .respond_with(ResponseTemplate::new(200).set_body_json(connection_response("start")))
            .expect(1)
            .mount(&mock_server)
            .await;

        api.refresh("connection-secret", None).await.unwrap();
    }

    #[tokio::test]
    async fn submit_interactive() {
        let (api, mock_server) = mock_client_and_server().await;

        Mock::given(method("PUT"))
            .and(path("/v1/connection/interactive"))
            .and(header(CONNECTION_SECRET_HEADER, "connection-secret"))
            .and(body_partial_json(json!({
                "data": { "credentials": { "sms_code": "123456" } }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(connection_response("fetch_accounts")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        api.submit_interactive(
            "connection-secret",
            &InteractiveCredentialsRequest {
                credentials: json!({ "sms_code": "123456" }),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn show() {
        let (api, mock_server) = mock_client_and_server().await;

        Mock::given(method("GET"))
            .and(path("/v1/connection"))
            .and(header(CONNECTION_SECRET_HEADER, "connection-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(connection_response("finish")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let connection = api.show("connection-secret").await.unwrap();

        assert_eq!(connection.stage(), Stage::Finish);
        assert_eq!(connection.fail_message(), None);
    }
}
