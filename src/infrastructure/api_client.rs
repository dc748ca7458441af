use crate::domain::outcome::ResponseOutcome;
use crate::domain::request::{MultipartField, RequestBody, RequestDescriptor};
use crate::domain::ApiError;
use crate::notify::{NotificationDurations, NotificationSink};
use crate::session::TokenProvider;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated request executor.
///
/// Every call is exactly one network attempt: no retries and no caching.
/// [`RequestExecutor::send`] returns `Result` for callers that propagate with
/// `?`; [`RequestExecutor::execute`] always resolves to a tagged
/// [`ResponseOutcome`]. Both sit on top of [`RequestExecutor::attempt`].
pub struct RequestExecutor {
    base_url: String,
    client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    notifier: Arc<dyn NotificationSink>,
    durations: NotificationDurations,
}

impl RequestExecutor {
    pub fn new(
        base_url: String,
        tokens: Arc<dyn TokenProvider>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            tokens,
            notifier,
            durations: NotificationDurations::default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, descriptor: &RequestDescriptor) -> String {
        if descriptor.url.starts_with("http://") || descriptor.url.starts_with("https://") {
            descriptor.url.clone()
        } else {
            format!(
                "{}/{}",
                self.base_url,
                descriptor.url.trim_start_matches('/')
            )
        }
    }

    /// Performs the call and classifies the result. Emits no notifications.
    pub async fn attempt(&self, descriptor: &RequestDescriptor) -> Result<(u16, Value), ApiError> {
        let Some(credential) = self.tokens.current_token() else {
            tracing::warn!(
                "Refusing {} {} without a session token",
                descriptor.method,
                descriptor.url
            );
            return Err(ApiError::Unauthorized);
        };

        let url = self.url_for(descriptor);
        let request_id = Uuid::new_v4().to_string();

        let mut request = self
            .client
            .request(descriptor.method.clone(), &url)
            .header(AUTHORIZATION, format!("token {}", credential.as_str()))
            .header("X-Request-Id", &request_id);

        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }

        if descriptor.sends_json_content_type() {
            request = request.header(CONTENT_TYPE, "application/json");
        }

        match &descriptor.body {
            Some(RequestBody::Json(body)) => {
                request = request.body(body.to_string());
            }
            Some(RequestBody::Multipart(fields)) => {
                request = request.multipart(build_form(fields)?);
            }
            None => {}
        }

        tracing::debug!(
            "{} {} request_id={}",
            descriptor.method,
            url,
            request_id
        );

        let response = request.send().await.map_err(|e| {
            tracing::warn!("Transport failure for request_id={}: {}", request_id, e);
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            tracing::debug!("request_id={} failed with status {}", request_id, status);
            return Err(ApiError::from_http_body(status, &body));
        }

        // 204 and friends carry no body.
        if body.trim().is_empty() {
            return Ok((status, Value::Null));
        }

        serde_json::from_str(&body)
            .map(|data| (status, data))
            .map_err(|e| {
                tracing::error!(
                    "request_id={} returned {} with an unparsable body: {}",
                    request_id,
                    status,
                    e
                );
                ApiError::CorruptResponse(e.to_string())
            })
    }

    /// Propagating flavor. Failures are also reported to the notification sink.
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<Value, ApiError> {
        match self.attempt(descriptor).await {
            Ok((_, data)) => Ok(data),
            Err(e) => {
                self.notify_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Tagged flavor. Never fails; failures are reported and returned as
    /// [`ResponseOutcome::Failure`].
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> ResponseOutcome {
        let result = self.attempt(descriptor).await;
        if let Err(e) = &result {
            self.notify_error(e.to_string());
        }
        ResponseOutcome::from(result)
    }

    pub fn notify_success(&self, message: impl Into<String>) {
        self.notifier.notify(self.durations.success(message));
    }

    pub fn notify_error(&self, message: impl Into<String>) {
        self.notifier.notify(self.durations.error(message));
    }
}

fn build_form(fields: &[MultipartField]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for field in fields {
        let mut part = Part::bytes(field.bytes.clone());
        if let Some(file_name) = &field.file_name {
            part = part.file_name(file_name.clone());
        }
        if let Some(mime) = &field.mime {
            part = part
                .mime_str(mime)
                .map_err(|e| ApiError::InvalidRequest(format!("invalid mime type {}: {}", mime, e)))?;
        }
        form = form.part(field.name.clone(), part);
    }
    Ok(form)
}
