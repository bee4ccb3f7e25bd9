use crate::{
    common::REQUEST_ID_HEADER,
    error::{ApiError, Error},
};
use async_trait::async_trait;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use task_local_extensions::Extensions;

/// Reqwest middleware which translates JSON error responses returned from FinLink APIs
/// into [`Error::ApiError`](crate::error::Error)s.
pub struct ErrorHandlingMiddleware;

#[async_trait]
impl Middleware for ErrorHandlingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        // Capture the response
        let response = next.run(req, extensions).await?;

        // Build an ApiError if the response is not a success
        if !response.status().is_success() {
            tracing::debug!("Failed HTTP request. Status code: {}", response.status());

            let api_error = api_error_from_response(response).await?;
            return Err(Error::ApiError(api_error).into());
        }

        Ok(response)
    }
}

/// Body of an error response from FinLink APIs.
#[derive(serde::Deserialize, Debug)]
#[serde(untagged)]
enum ErrorResponseBody {
    ErrorResponse {
        error: ErrorBody,
        request_id: Option<String>,
    },
    Unknown,
}

#[derive(serde::Deserialize, Debug)]
struct ErrorBody {
    class: String,
    message: Option<String>,
    documentation_url: Option<String>,
}

async fn api_error_from_response(response: Response) -> reqwest_middleware::Result<ApiError> {
    let status = response.status().as_u16();
    let header_request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    // Parse the response body as JSON
    let bytes = response.bytes().await?;
    let error_response: ErrorResponseBody =
        serde_json::from_slice(&bytes).unwrap_or(ErrorResponseBody::Unknown);

    let api_error = match error_response {
        ErrorResponseBody::ErrorResponse { error, request_id } => ApiError {
            class: error.class,
            message: error.message.unwrap_or_default(),
            status,
            request_id: request_id.or(header_request_id),
            documentation_url: error.documentation_url,
        },
        ErrorResponseBody::Unknown => ApiError {
            class: "ServerError".to_string(),
            message: String::new(),
            status,
            request_id: header_request_id,
            documentation_url: None,
        },
    };

    Ok(api_error)
}
