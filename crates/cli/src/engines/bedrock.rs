// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Amazon Bedrock engine (Anthropic messages API).
//!
//! A Bedrock API key (`api_key` or `AWS_BEARER_TOKEN_BEDROCK`) is sent as a
//! bearer token. Without one, AWS credentials are resolved from
//! `aws_profile`, or from the default provider chain when no profile is
//! named, and every request is SigV4-signed. Throttling and server errors
//! are retried with exponential backoff up to `max_retry` attempts in total.

use std::time::{Duration, SystemTime};

use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use super::tags::ExtractedText;
use super::{Engine, EngineError, EngineInstance};
use crate::env;
use crate::plugin::{ConfigurationError, PluginParams};
use crate::prompt::{Prompt, Response};

const TRACE_HEADER: &str = "x-amzn-bedrock-trace";
const GUARDRAIL_ID_HEADER: &str = "x-amzn-bedrock-guardrailidentifier";
const GUARDRAIL_VERSION_HEADER: &str = "x-amzn-bedrock-guardrailversion";
const MAX_BACKOFF: Duration = Duration::from_secs(20);
const SIGNING_NAME: &str = "bedrock";

fn default_max_retry() -> u32 {
    10
}

fn default_retry_mode() -> String {
    "adaptive".to_string()
}

fn default_version() -> String {
    "bedrock-2023-05-31".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_backoff_ms() -> u64 {
    500
}

/// Parameters of the `bedrock` engine.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BedrockConfig {
    /// Shared-config profile used for SigV4 when no API key is set
    #[serde(default)]
    pub aws_profile: Option<String>,

    #[serde(default)]
    pub aws_region: Option<String>,

    /// Control-plane endpoint; accepted but not used for invocation.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Overrides `https://bedrock-runtime.<region>.amazonaws.com`
    #[serde(default)]
    pub runtime_url: Option<String>,

    #[serde(default = "default_max_retry")]
    pub max_retry: u32,

    #[serde(default = "default_retry_mode")]
    pub retry_mode: String,

    pub model_id: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub trace: Option<String>,

    #[serde(default)]
    pub guardrail_id: Option<String>,

    #[serde(default)]
    pub guardrail_version: Option<String>,

    #[serde(default)]
    pub hyperparameters: Hyperparameters,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Base delay of the first retry
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Sampling parameters sent with every request.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Hyperparameters {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub role: String,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            max_tokens: 30000,
            temperature: 0.0,
            top_p: 1.0,
            top_k: 250,
            role: "user".to_string(),
        }
    }
}

/// Config values like `"None"` and `""` mean "not set".
fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "None" && !v.starts_with("${"))
}

/// How requests prove who they are.
#[derive(Clone, Debug)]
pub(super) enum Auth {
    /// `Authorization: Bearer` with an API key, already in the headers.
    Bearer,
    SigV4 {
        credentials: Credentials,
        region: String,
    },
}

pub struct BedrockEngine {
    client: Client,
    url: String,
    headers: HeaderMap,
    auth: Auth,
    config: BedrockConfig,
}

impl BedrockEngine {
    pub fn new(config: BedrockConfig) -> Result<Self, EngineError> {
        let auth = match bearer_key(&config) {
            Some(_) => Auth::Bearer,
            None => {
                let region = configured_region(&config).ok_or_else(|| {
                    ConfigurationError::MissingParameter("aws_region".to_string())
                })?;
                let credentials = load_credentials(present(&config.aws_profile))?;
                Auth::SigV4 {
                    credentials,
                    region,
                }
            }
        };
        Self::with_auth(config, auth)
    }

    pub(super) fn with_auth(config: BedrockConfig, auth: Auth) -> Result<Self, EngineError> {
        let url = invoke_url(&config)?;
        let headers = request_headers(&config)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url,
            headers,
            auth,
            config,
        })
    }

    /// Headers for one attempt; SigV4 signatures are computed per attempt.
    fn attempt_headers(&self, body: &[u8]) -> Result<HeaderMap, EngineError> {
        match &self.auth {
            Auth::Bearer => Ok(self.headers.clone()),
            Auth::SigV4 {
                credentials,
                region,
            } => signed_headers(&self.url, &self.headers, body, credentials, region),
        }
    }

    /// JSON body for one prompt.
    pub fn request_body(&self, prompt: &Prompt) -> Value {
        build_request_body(&self.config, prompt)
    }

    fn send(&self, body: &Value) -> Result<String, EngineError> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| EngineError::MalformedResponse(format!("cannot encode request: {e}")))?;
        let attempts = self.config.max_retry.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .post(&self.url)
                .headers(self.attempt_headers(&payload)?)
                .body(payload.clone())
                .send();
            match result {
                Ok(resp) if resp.status().is_success() => return Ok(resp.text()?),
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().unwrap_or_default();
                    if !is_retryable(status) || attempt >= attempts {
                        return Err(EngineError::Status {
                            status: status.as_u16(),
                            body: text,
                        });
                    }
                    tracing::debug!(%status, attempt, "bedrock request throttled, retrying");
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < attempts => {
                    tracing::debug!(error = %e, attempt, "bedrock request failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }
            std::thread::sleep(backoff_delay(self.config.backoff_ms, attempt));
        }
    }
}

impl Engine for BedrockEngine {
    fn invoke(&mut self, prompt: &Prompt) -> Result<Response, EngineError> {
        let body = self.request_body(prompt);
        let raw = self.send(&body)?;
        parse_response(&raw)
    }

    fn name(&self) -> &'static str {
        "bedrock"
    }
}

fn configured_region(config: &BedrockConfig) -> Option<String> {
    present(&config.aws_region)
        .map(str::to_string)
        .or_else(env::aws_region)
}

fn bearer_key(config: &BedrockConfig) -> Option<String> {
    present(&config.api_key)
        .map(str::to_string)
        .or_else(env::bedrock_api_key)
}

/// `<base>/model/<model_id>/invoke`, with the model id as one encoded path
/// segment so ARNs keep their slashes.
pub(super) fn invoke_url(config: &BedrockConfig) -> Result<String, EngineError> {
    let base = match present(&config.runtime_url) {
        Some(url) => url.to_string(),
        None => {
            let region = configured_region(config).ok_or_else(|| {
                ConfigurationError::MissingParameter("aws_region".to_string())
            })?;
            format!("https://bedrock-runtime.{region}.amazonaws.com")
        }
    };
    let invalid = |message: String| {
        EngineError::Configuration(ConfigurationError::InvalidParams {
            context: "bedrock engine".to_string(),
            message,
        })
    };
    let mut url =
        Url::parse(&base).map_err(|e| invalid(format!("invalid runtime url '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| invalid(format!("runtime url '{base}' cannot have a path")))?
        .pop_if_empty()
        .extend(["model", config.model_id.as_str(), "invoke"]);
    Ok(url.into())
}

fn request_headers(config: &BedrockConfig) -> Result<HeaderMap, EngineError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(api_key) = bearer_key(config) {
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {api_key}"))?);
    }
    if let Some(trace) = present(&config.trace) {
        headers.insert(TRACE_HEADER, header_value(trace)?);
    }
    if let Some(id) = present(&config.guardrail_id) {
        headers.insert(GUARDRAIL_ID_HEADER, header_value(id)?);
        if let Some(version) = present(&config.guardrail_version) {
            headers.insert(GUARDRAIL_VERSION_HEADER, header_value(version)?);
        }
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, EngineError> {
    HeaderValue::from_str(value).map_err(|e| {
        EngineError::Configuration(ConfigurationError::InvalidParams {
            context: "bedrock engine".to_string(),
            message: format!("invalid header value: {e}"),
        })
    })
}

/// Resolve AWS credentials from `profile`, or the default chain.
fn load_credentials(profile: Option<&str>) -> Result<Credentials, EngineError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| EngineError::Authentication(format!("cannot start credential loader: {e}")))?;
    runtime.block_on(async {
        let provider = match profile {
            Some(name) => Some(SharedCredentialsProvider::new(
                ProfileFileCredentialsProvider::builder()
                    .profile_name(name)
                    .build(),
            )),
            None => aws_config::defaults(BehaviorVersion::latest())
                .load()
                .await
                .credentials_provider(),
        };
        match provider {
            Some(provider) => provider.provide_credentials().await.map_err(|e| {
                EngineError::Authentication(format!("cannot resolve AWS credentials: {e}"))
            }),
            None => Err(EngineError::Authentication(format!(
                "no AWS credentials; set `api_key`, {} or `aws_profile`",
                env::AWS_BEARER_TOKEN_BEDROCK
            ))),
        }
    })
}

/// `headers` plus the SigV4 headers for a POST of `body` to `url`.
pub(super) fn signed_headers(
    url: &str,
    headers: &HeaderMap,
    body: &[u8],
    credentials: &Credentials,
    region: &str,
) -> Result<HeaderMap, EngineError> {
    let identity = credentials.clone().into();
    let params = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name(SIGNING_NAME)
        .time(SystemTime::now())
        .settings(SigningSettings::default())
        .build()
        .map_err(signing_error)?
        .into();
    let pairs: Vec<(&str, &str)> = headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();
    let request = SignableRequest::new("POST", url, pairs.into_iter(), SignableBody::Bytes(body))
        .map_err(signing_error)?;
    let (instructions, _signature) = sign(request, &params)
        .map_err(signing_error)?
        .into_parts();

    let mut signed = headers.clone();
    for (name, value) in instructions.headers() {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(signing_error)?;
        signed.insert(name, header_value(value)?);
    }
    Ok(signed)
}

fn signing_error(e: impl std::fmt::Display) -> EngineError {
    EngineError::Authentication(format!("cannot sign request: {e}"))
}

pub(super) fn build_request_body(config: &BedrockConfig, prompt: &Prompt) -> Value {
    let hp = &config.hyperparameters;
    json!({
        "anthropic_version": config.version,
        "max_tokens": hp.max_tokens,
        "system": prompt.system_prompt(),
        "messages": [{
            "role": hp.role,
            "content": [{ "type": "text", "text": prompt.instruction() }],
        }],
        "temperature": hp.temperature,
        "top_p": hp.top_p,
        "top_k": hp.top_k,
    })
}

/// Parse a messages API body into a [`Response`].
pub(super) fn parse_response(raw: &str) -> Result<Response, EngineError> {
    let body: Value = serde_json::from_str(raw)
        .map_err(|e| EngineError::MalformedResponse(format!("invalid JSON: {e}")))?;
    let text = body
        .get("content")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::MalformedResponse("missing content[0].text".to_string()))?;
    let extracted = ExtractedText::from_model_output(text);
    Ok(Response::new(extracted.response, extracted.rationale))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before retry number `attempt` (1-based).
pub(super) fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(base_ms.saturating_mul(factor)).min(MAX_BACKOFF)
}

pub(super) fn construct(params: &PluginParams) -> Result<EngineInstance, EngineError> {
    let config: BedrockConfig = params.deserialize("bedrock engine")?;
    tracing::trace!(
        model_id = %config.model_id,
        retry_mode = %config.retry_mode,
        "constructing bedrock engine"
    );
    Ok(EngineInstance::Direct(Box::new(BedrockEngine::new(config)?)))
}

#[cfg(test)]
#[path = "bedrock_tests.rs"]
mod tests;
