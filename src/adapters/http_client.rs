use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::domain::config::BackendConfig;
use crate::domain::{
    DomainError, FormPart, Method, RequestBody, RequestDescriptor, RequestFailure, RequestPolicy,
    ResponseEnvelope,
};
use crate::ports::HttpClient;

/// reqwest-backed HTTP client core.
///
/// Every request to the backend goes through here: relative paths are
/// prefixed with the configured origin, failed attempts are retried after a
/// fixed delay, and an optional deadline cancels the whole exchange.
pub struct ReqwestHttpClient {
    client: Client,
    origin: String,
}

impl ReqwestHttpClient {
    /// Create a client for the configured backend.
    pub fn new(config: &BackendConfig) -> Result<Self, DomainError> {
        Self::with_origin(&config.origin, &config.user_agent)
    }

    /// Create a client for an explicit origin.
    pub fn with_origin(origin: &str, user_agent: &str) -> Result<Self, DomainError> {
        let parsed = Url::parse(origin.trim())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DomainError::Config(format!(
                "Backend origin must be http or https, got '{}'",
                origin
            )));
        }

        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DomainError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let origin = origin.trim().trim_end_matches('/').to_string();
        info!(origin = %origin, "HTTP client initialized");

        Ok(Self { client, origin })
    }

    /// Absolute URLs pass through, relative paths are appended to the origin.
    fn resolve(&self, path: &str) -> Result<Url, RequestFailure> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.origin, path)
        } else {
            format!("{}/{}", self.origin, path)
        };

        Url::parse(&raw).map_err(|e| {
            warn!(url = %raw, error = %e, "Invalid request URL");
            RequestFailure::invalid_url(&raw)
        })
    }

    fn build(&self, url: &Url, request: &RequestDescriptor) -> RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)),
        }
    }

    /// One network round trip.
    async fn attempt(
        &self,
        url: &Url,
        request: &RequestDescriptor,
    ) -> Result<ResponseEnvelope, RequestFailure> {
        let response = self.build(url, request).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Backend unreachable");
            RequestFailure::unreachable(&self.origin)
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let failure = RequestFailure::from_response(status.as_u16(), &body);
            warn!(
                url = %url,
                status = status.as_u16(),
                message = failure.message(),
                "Backend returned an error status"
            );
            return Err(failure);
        }

        let body = response.bytes().await.map_err(|e| {
            warn!(url = %url, error = %e, "Failed to read response body");
            RequestFailure::unreachable(&self.origin)
        })?;

        Ok(ResponseEnvelope {
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }

    /// Bounded retry loop with a fixed delay between attempts.
    async fn send_with_retry(
        &self,
        url: &Url,
        request: &RequestDescriptor,
        policy: &RequestPolicy,
    ) -> Result<ResponseEnvelope, RequestFailure> {
        let mut remaining = policy.retries;
        let mut attempt = 1u32;

        loop {
            match self.attempt(url, request).await {
                Ok(response) => {
                    info!(url = %url, status = response.status, attempt, "Request succeeded");
                    return Ok(response);
                }
                Err(failure) if remaining > 0 => {
                    warn!(
                        url = %url,
                        attempt,
                        remaining,
                        delay_ms = policy.retry_delay.as_millis() as u64,
                        error = %failure,
                        "Request failed, retrying"
                    );
                    remaining -= 1;
                    attempt += 1;
                    tokio::time::sleep(policy.retry_delay).await;
                }
                Err(failure) => {
                    error!(url = %url, attempt, error = %failure, "Request failed");
                    return Err(failure);
                }
            }
        }
    }
}

fn build_form(parts: &[FormPart]) -> Form {
    parts.iter().fold(Form::new(), |form, part| match part {
        FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
        FormPart::File {
            name,
            file_name,
            mime,
            bytes,
        } => {
            let file_part = Part::bytes(bytes.clone()).file_name(file_name.clone());
            let file_part = match file_part.mime_str(mime) {
                Ok(p) => p,
                Err(e) => {
                    warn!(mime = %mime, error = %e, "Invalid upload content type, sending without one");
                    Part::bytes(bytes.clone()).file_name(file_name.clone())
                }
            };
            form.part(name.clone(), file_part)
        }
    })
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(
        &self,
        request: RequestDescriptor,
        policy: &RequestPolicy,
    ) -> Result<ResponseEnvelope, RequestFailure> {
        let url = self.resolve(&request.path)?;
        debug!(request = ?request, "Request descriptor");
        info!(method = request.method.as_str(), url = %url, "Sending request");

        match policy.timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.send_with_retry(&url, &request, policy)).await {
                    Ok(result) => result,
                    Err(_) => {
                        error!(url = %url, timeout_ms = deadline.as_millis() as u64, "Request aborted: deadline exceeded");
                        Err(RequestFailure::timed_out(deadline))
                    }
                }
            }
            None => self.send_with_retry(&url, &request, policy).await,
        }
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}
