//! HTTP client implementation

use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use siteship_api_types::ApiErrorBody;

use crate::authn::api_key::ApiKey;
use crate::errors::CliError;

/// HTTP client for the hosting API, authenticated with an API key
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: ApiKey,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, api_key: ApiKey) -> Result<Self, CliError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("siteship/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            header::AUTHORIZATION,
            format!("apikey {}", self.api_key.expose()),
        )
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        self.get_with_query(path, &[]).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CliError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let request = self.authorized(self.client.get(&url).query(query));
        self.send("GET", request).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CliError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let request = self.authorized(self.client.post(&url).json(body));
        self.send("POST", request).await
    }

    /// Make a multipart POST request
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, CliError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {} (multipart)", url);

        let request = self.authorized(self.client.post(&url).multipart(form));
        self.send("POST", request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        request: RequestBuilder,
    ) -> Result<T, CliError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!("HTTP {} failed: {} - {}", method, status, body);
            return Err(error_from_response(status.as_u16(), body));
        }

        // Some endpoints answer with an empty body
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }
}

/// Structured error bodies become `Api` errors, everything else `Http`
pub(crate) fn error_from_response(status: u16, body: String) -> CliError {
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) if !parsed.errors.is_empty() => CliError::Api {
            status,
            codes: parsed.codes(),
            body,
        },
        _ => CliError::Http { status, body },
    }
}
