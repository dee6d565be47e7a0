use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::{error::ApiClientError, session::SessionStore};

/// HTTP adapter boundary. Joins paths onto the configured base url,
/// attaches the bearer token read from the session store at call time, and
/// normalizes every failure into [`ApiClientError`] so no raw transport
/// error crosses into callers.
pub struct ApiTransport {
    http: Client,
    base_url: Url,
    session: Arc<SessionStore>,
}

impl ApiTransport {
    pub fn new(base_url: Url, session: Arc<SessionStore>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            session,
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiClientError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| ApiClientError::Network(format!("invalid request url '{path}': {err}")))?;
        let mut builder = self.http.request(method, url);
        // Absence of a token is tolerated; the server answers 401 and the
        // caller surfaces it.
        if let Some(token) = self.session.bearer_token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiClientError> {
        let response = builder
            .send()
            .await
            .map_err(|err| ApiClientError::Network(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiClientError> {
        response
            .json::<T>()
            .await
            .map_err(|err| ApiClientError::Network(format!("failed to decode response body: {err}")))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiClientError> {
        let response = self.execute(self.request(Method::GET, path)?).await?;
        Self::decode(response).await
    }

    /// GET returning the raw JSON value, for responses whose shape must be
    /// sniffed before they can be typed (collection envelopes).
    pub async fn get_value(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiClientError> {
        let mut builder = self.request(Method::GET, path)?;
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiClientError> {
        let response = self
            .execute(self.request(Method::POST, path)?.json(body))
            .await?;
        Self::decode(response).await
    }

    /// POST where the caller only cares that the request succeeded.
    pub async fn post_json_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiClientError> {
        self.execute(self.request(Method::POST, path)?.json(body))
            .await?;
        Ok(())
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiClientError> {
        let response = self
            .execute(self.request(Method::PUT, path)?.json(body))
            .await?;
        Self::decode(response).await
    }

    /// DELETE; a 204 or otherwise empty body is the expected success case.
    pub async fn delete(&self, path: &str) -> Result<(), ApiClientError> {
        self.execute(self.request(Method::DELETE, path)?).await?;
        Ok(())
    }
}

fn error_from_response(status: StatusCode, body: &str) -> ApiClientError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| shared::error::extract_error_message(&value))
        .or_else(|| {
            let text = body.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    if status.is_server_error() {
        ApiClientError::Fault {
            status: status.as_u16(),
            message,
        }
    } else {
        ApiClientError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
