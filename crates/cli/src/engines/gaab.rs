// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Generative AI Application Builder engine over a websocket.
//!
//! Construction authenticates against Cognito (`USER_PASSWORD_AUTH`) and
//! keeps the access token. `connect` opens `<ws_url>?Authorization=<token>`
//! on a background thread; `invoke` sends one `sendMessage` request and
//! reads streamed tokens until the end-of-conversation marker.

use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::tags::ExtractedText;
use super::{ConnectedEngine, Engine, EngineError, EngineInstance};
use crate::env;
use crate::plugin::{ConfigurationError, PluginParams};
use crate::prompt::{Prompt, Response};

/// Stream marker ending one answer.
pub const END_OF_CONVERSATION: &str = "##END_CONVERSATION##";

const ACTION_NAME: &str = "sendMessage";
const CONNECTION_OPEN_TIMEOUT: Duration = Duration::from_secs(5);
const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";

static SOURCES: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?s)(\{"sourceDocument":.*)INPUT DATA"#).ok());

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

fn default_max_retry() -> u32 {
    10
}

fn default_retry_mode() -> String {
    "adaptive".to_string()
}

/// Parameters of the `gaab` engine.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaabConfig {
    pub ws_url: String,
    pub app_client_id: String,
    pub user_name: String,
    pub password: String,

    /// Accepted for config compatibility; unused.
    #[serde(default)]
    pub aws_profile: Option<String>,

    #[serde(default)]
    pub aws_region: Option<String>,

    /// Accepted for config compatibility; unused.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Overrides `https://cognito-idp.<region>.amazonaws.com/`
    #[serde(default)]
    pub cognito_url: Option<String>,

    #[serde(default = "default_max_retry")]
    pub max_retry: u32,

    #[serde(default = "default_retry_mode")]
    pub retry_mode: String,
}

/// One decoded websocket message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamItem {
    Token(String),
    End,
}

impl StreamItem {
    /// Decode a text frame. Frames that carry nothing useful yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        let object = value.as_object()?;
        if let Some(data) = object.get("data") {
            return Some(match data.as_str() {
                Some(END_OF_CONVERSATION) => StreamItem::End,
                Some(s) => StreamItem::Token(s.to_string()),
                None => StreamItem::Token(data.to_string()),
            });
        }
        if object.contains_key("sourceDocument") {
            return Some(StreamItem::Token(text.to_string()));
        }
        object
            .get("generated_question")
            .and_then(Value::as_str)
            .map(|q| StreamItem::Token(q.to_string()))
    }
}

/// Join streamed tokens into words.
///
/// A token starting with a space begins a new word; anything else is glued
/// onto the current one.
pub fn merge_tokens<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for token in tokens {
        let token = token.as_ref();
        if token.starts_with(' ') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push_str(token.trim());
        } else {
            current.push_str(token);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Turn a full streamed answer into a [`Response`].
pub(super) fn response_from_message(message: &str) -> Response {
    let extracted = ExtractedText::from_model_output(message);
    let sources = SOURCES
        .as_ref()
        .and_then(|re| re.captures(message))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    Response::new(extracted.response, extracted.rationale).with_sources(sources)
}

/// `ws_url` with the access token appended as the `Authorization` query
/// parameter.
pub(super) fn socket_url(ws_url: &str, token: &str) -> Result<String, EngineError> {
    let mut url = Url::parse(ws_url).map_err(|e| ConfigurationError::InvalidParams {
        context: "gaab engine".to_string(),
        message: format!("invalid ws_url '{ws_url}': {e}"),
    })?;
    url.query_pairs_mut().append_pair("Authorization", token);
    Ok(url.into())
}

/// Exchange user credentials for a Cognito access token.
pub(super) fn authenticate(config: &GaabConfig) -> Result<String, EngineError> {
    let url = match config.cognito_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => url.to_string(),
        None => {
            let region = config
                .aws_region
                .clone()
                .filter(|r| !r.is_empty() && !r.starts_with("${"))
                .or_else(env::aws_region)
                .ok_or_else(|| {
                    ConfigurationError::MissingParameter("aws_region".to_string())
                })?;
            format!("https://cognito-idp.{region}.amazonaws.com/")
        }
    };

    let body = json!({
        "AuthFlow": "USER_PASSWORD_AUTH",
        "ClientId": config.app_client_id,
        "AuthParameters": {
            "USERNAME": config.user_name,
            "PASSWORD": config.password,
        },
    });
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    let resp = client
        .post(&url)
        .header("x-amz-target", INITIATE_AUTH_TARGET)
        .header(reqwest::header::CONTENT_TYPE, "application/x-amz-json-1.1")
        .body(body.to_string())
        .send()?;

    let status = resp.status();
    let text = resp.text()?;
    if !status.is_success() {
        return Err(EngineError::Authentication(format!(
            "Cognito returned {status}: {text}"
        )));
    }
    let parsed: Value = serde_json::from_str(&text)
        .map_err(|e| EngineError::Authentication(format!("invalid Cognito response: {e}")))?;
    parsed
        .pointer("/AuthenticationResult/AccessToken")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EngineError::Authentication("no access token in Cognito response".into()))
}

pub struct GaabEngine {
    url: String,
    token: String,
    socket: Option<Socket>,
    pending: Option<Receiver<Result<Socket, String>>>,
}

impl GaabEngine {
    /// Engine for an already-issued access token.
    pub fn new(ws_url: &str, token: impl Into<String>) -> Result<Self, EngineError> {
        let token = token.into();
        Ok(Self {
            url: socket_url(ws_url, &token)?,
            token,
            socket: None,
            pending: None,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn request_body(&self, prompt: &Prompt) -> Value {
        json!({
            "action": ACTION_NAME,
            "question": prompt.instruction(),
            "authToken": self.token,
            "conversationId": "",
            "promptTemplate": format!(
                "{}\n\n{{context}}\n\n{{history}}\n\n{{input}}",
                prompt.system_prompt()
            ),
        })
    }

    fn read_answer(socket: &mut Socket) -> Result<String, EngineError> {
        let mut tokens = Vec::new();
        loop {
            let message = socket
                .read()
                .map_err(|e| EngineError::Connection(e.to_string()))?;
            match message {
                Message::Text(text) => match StreamItem::parse(text.as_str()) {
                    Some(StreamItem::End) => break,
                    Some(StreamItem::Token(token)) => tokens.push(token),
                    None => tracing::trace!("ignoring websocket frame"),
                },
                Message::Close(_) => {
                    return Err(EngineError::Connection(
                        "socket closed before the end of the conversation".to_string(),
                    ))
                }
                _ => {}
            }
        }
        Ok(merge_tokens(&tokens).join(" "))
    }
}

impl Engine for GaabEngine {
    fn invoke(&mut self, prompt: &Prompt) -> Result<Response, EngineError> {
        if self.socket.is_none() {
            self.wait_for_connection(CONNECTION_OPEN_TIMEOUT);
        }
        let body = self.request_body(prompt).to_string();
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| EngineError::Connection("websocket is not connected".to_string()))?;
        socket
            .send(Message::text(body))
            .map_err(|e| EngineError::Connection(e.to_string()))?;
        let message = Self::read_answer(socket)?;
        tracing::trace!(len = message.len(), "gaab answer received");
        Ok(response_from_message(&message))
    }

    fn name(&self) -> &'static str {
        "gaab"
    }
}

impl ConnectedEngine for GaabEngine {
    fn connect(&mut self) -> Result<(), EngineError> {
        let (tx, rx) = mpsc::channel();
        let url = self.url.clone();
        std::thread::Builder::new()
            .name("gaab-connect".to_string())
            .spawn(move || {
                let result = tungstenite::connect(url.as_str())
                    .map(|(socket, _)| socket)
                    .map_err(|e| e.to_string());
                let _ = tx.send(result);
            })
            .map_err(|e| EngineError::Connection(e.to_string()))?;
        self.pending = Some(rx);
        Ok(())
    }

    fn wait_for_connection(&mut self, timeout: Duration) -> bool {
        if self.socket.is_some() {
            return true;
        }
        let Some(rx) = self.pending.as_ref() else {
            return false;
        };
        match rx.recv_timeout(timeout) {
            Ok(Ok(socket)) => {
                self.socket = Some(socket);
                self.pending = None;
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "websocket connection failed");
                self.pending = None;
                false
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                self.pending = None;
                false
            }
        }
    }
}

impl Drop for GaabEngine {
    fn drop(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
            let _ = socket.flush();
        }
    }
}

pub(super) fn construct(params: &PluginParams) -> Result<EngineInstance, EngineError> {
    let config: GaabConfig = params.deserialize("gaab engine")?;
    tracing::trace!(retries = config.max_retry, mode = %config.retry_mode, "authenticating");
    let token = authenticate(&config)?;
    Ok(EngineInstance::Connected(Box::new(GaabEngine::new(
        &config.ws_url,
        token,
    )?)))
}

#[cfg(test)]
#[path = "gaab_tests.rs"]
mod tests;
