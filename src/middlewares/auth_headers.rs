use crate::{
    client::AppCredentials,
    common::{APP_ID_HEADER, APP_SECRET_HEADER},
    Error,
};
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::{header::HeaderValue, Request, Response};
use reqwest_middleware::{Middleware, Next};
use secrecy::ExposeSecret;
use task_local_extensions::Extensions;

/// Middleware to inject the `App-id` and `Secret` headers to all outgoing requests.
///
/// FinLink authenticates every API call with this static header pair; there is
/// no token exchange.
pub struct AuthHeadersMiddleware {
    credentials: AppCredentials,
}

impl AuthHeadersMiddleware {
    pub fn new(credentials: AppCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl Middleware for AuthHeadersMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let app_id = HeaderValue::from_str(&self.credentials.app_id)
            .map_err(|_| Error::Other(anyhow!("App id is not a valid header value")))?;
        let mut secret = HeaderValue::from_str(self.credentials.secret.expose_secret())
            .map_err(|_| Error::Other(anyhow!("App secret is not a valid header value")))?;
        secret.set_sensitive(true);

        req.headers_mut().insert(APP_ID_HEADER, app_id);
        req.headers_mut().insert(APP_SECRET_HEADER, secret);

        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{header, method},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn injects_credential_headers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header(APP_ID_HEADER, "app-id"))
            .and(header(APP_SECRET_HEADER, "app-secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
            .with(AuthHeadersMiddleware::new(AppCredentials::new(
                "app-id",
                "app-secret",
            )))
            .build();

        let res = client.get(mock_server.uri()).send().await.unwrap();
        assert!(res.status().is_success());
    }
}
