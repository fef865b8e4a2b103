//! Single request/response cycle against the control endpoint.
//!
//! Every request is an HTTP POST of URL-encoded form parameters to
//! `control.cgi`. The executor attaches the session cookie when one is
//! published, derives the timeout (long-polls get the negotiated duration
//! plus grace), and performs the single re-authentication retry on 401.

use crate::auth::{AuthManager, Credential};
use crate::config::ConnectionConfig;
use crate::error::request::RequestError;
use crate::wire::{ACTION_GET_STATE, PendingCommand};
use crate::{AUTH_COOKIE, CONTROL_SCRIPT, MONITOR_USER_AGENT};

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use reqwest::Client;
use reqwest::header::{ACCEPT_CHARSET, CONTENT_TYPE, COOKIE, USER_AGENT};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Issues control requests and owns the 401-retry policy.
pub struct RequestExecutor {
    control_url: Url,
    client: Client,
    auth: AuthManager,
    token: Arc<RwLock<Option<String>>>,
    request_timeout: Duration,
    poll_grace: Duration,
}

impl RequestExecutor {
    pub fn new(
        config: &ConnectionConfig,
        credential: Option<Credential>,
    ) -> Result<Self, RequestError> {
        let base_url = Url::parse(&config.normalized_base_url())?;
        let control_url = base_url.join(CONTROL_SCRIPT)?;
        let client = Client::builder().build()?;

        let token = Arc::new(RwLock::new(None));
        let auth = AuthManager::new(
            base_url,
            client.clone(),
            credential,
            config.timing.request_timeout(),
            Arc::clone(&token),
        );

        Ok(Self {
            control_url,
            client,
            auth,
            token,
            request_timeout: config.timing.request_timeout(),
            poll_grace: config.timing.poll_grace(),
        })
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    /// Issue the request and decode the JSON response body.
    pub async fn perform_json<T: DeserializeOwned>(
        &self,
        command: &PendingCommand,
    ) -> Result<T, RequestError> {
        let body = self.perform(command).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Issue the request and return the response body verbatim.
    pub async fn perform_text(&self, command: &PendingCommand) -> Result<String, RequestError> {
        self.perform(command).await
    }

    async fn perform(&self, command: &PendingCommand) -> Result<String, RequestError> {
        match self.execute_once(command).await {
            Err(RequestError::Auth { .. }) if self.auth.has_credential() => {
                debug!("got 401 for '{}', re-authenticating", command.action());
                self.auth.login().await?;
                self.execute_once(command).await
            }
            other => other,
        }
    }

    async fn execute_once(&self, command: &PendingCommand) -> Result<String, RequestError> {
        let body = encode_form_with_format(command.params());
        trace!("POST {} {}", self.control_url, command.action());

        let mut request = self
            .client
            .post(self.control_url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(ACCEPT_CHARSET, "utf-8")
            .header(USER_AGENT, MONITOR_USER_AGENT)
            .timeout(self.timeout_for(command))
            .body(body);

        let token = self.token.read().await.clone();
        if let Some(token) = token {
            request = request.header(COOKIE, format!("{AUTH_COOKIE}={token}"));
        }

        let response = request.send().await?;
        let status = HttpStatusCode::from(response.status().as_u16());

        if status.is_unauthorized() {
            return Err(RequestError::auth(format!(
                "HTTP 401 for '{}'",
                command.action()
            )));
        }

        if status.is_client_error() || status.is_server_error() {
            warn!("request '{}' failed: HTTP {}", command.action(), status);
            return Err(RequestError::Http {
                status,
                message: response.text().await.unwrap_or_default(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(response.text().await?)
    }

    /// Long-polls are held open by the server for the requested duration,
    /// so their timeout is that duration plus processing grace.
    pub(crate) fn timeout_for(&self, command: &PendingCommand) -> Duration {
        if command.action() == ACTION_GET_STATE
            && let Some(duration) = command.get("duration")
            && let Ok(parsed) = humantime::parse_duration(duration)
        {
            return parsed + self.poll_grace;
        }

        self.request_timeout
    }
}

/// URL-encode parameters into a form body, appending `format=json`.
pub(crate) fn encode_form_with_format(params: &[(String, String)]) -> String {
    let mut encoded: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect();
    encoded.push(String::from("format=json"));
    encoded.join("&")
}
