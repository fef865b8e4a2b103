//! Salted challenge-response login.
//!
//! The raw password never crosses the wire. The handshake is:
//!
//! 1. `GET login.cgi?get-nonce=1` - server answers with `{Salt, Nonce}`,
//!    both base64.
//! 2. `H1 = SHA256(utf8(password) || salt)` - skipped when the configured
//!    credential is already the pre-salted hash.
//! 3. `H2 = SHA256(nonce || H1)` - the only value transmitted.
//! 4. `GET login.cgi?password=<H2>` with the nonce echoed in the
//!    `session-nonce` cookie; a 200 response carries the session token in a
//!    `session-auth` Set-Cookie.
//!
//! A successful login replaces the process-wide session token wholesale;
//! readers never observe a partial update.

use crate::error::request::RequestError;
use crate::wire::SaltAndNonce;
use crate::{AUTH_COOKIE, LOGIN_SCRIPT, MONITOR_USER_AGENT, NONCE_COOKIE};

use common::RedactedPassword;

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use log::{debug, info};
use reqwest::Client;
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE, USER_AGENT};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// The configured server credential.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Raw password; salted with the server's stored salt on every login.
    Password(RedactedPassword),

    /// Pre-salted password hash (base64), used directly as the H1 base.
    SaltedHash(RedactedPassword),
}

/// Performs the login handshake and owns the shared session token slot.
pub struct AuthManager {
    base_url: Url,
    client: Client,
    credential: Option<Credential>,
    request_timeout: Duration,
    token: Arc<RwLock<Option<String>>>,
    // Serializes handshakes so a burst of 401s triggers one login
    login_gate: Mutex<()>,
}

impl AuthManager {
    pub fn new(
        base_url: Url,
        client: Client,
        credential: Option<Credential>,
        request_timeout: Duration,
        token: Arc<RwLock<Option<String>>>,
    ) -> Self {
        Self {
            base_url,
            client,
            credential,
            request_timeout,
            token,
            login_gate: Mutex::new(()),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Run the handshake and publish the fresh session token.
    pub async fn login(&self) -> Result<(), RequestError> {
        let _gate = self.login_gate.lock().await;

        let token = self.handshake().await?;
        *self.token.write().await = Some(token);

        info!("session established with {}", self.base_url);
        Ok(())
    }

    /// Run the handshake and hand the token back without publishing it.
    ///
    /// Used to mint a one-shot token for the status page URL.
    pub async fn mint_token(&self) -> Result<String, RequestError> {
        let _gate = self.login_gate.lock().await;
        self.handshake().await
    }

    async fn handshake(&self) -> Result<String, RequestError> {
        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| RequestError::auth("no credential configured"))?;

        let salt_and_nonce = self.fetch_salt_and_nonce().await?;
        debug!("login nonce received");

        let base_hash = derive_base_hash(credential, &salt_and_nonce.salt)?;
        let login_hash = derive_login_hash(&base_hash, &salt_and_nonce.nonce)?;

        self.perform_login(&login_hash, &salt_and_nonce.nonce).await
    }

    async fn fetch_salt_and_nonce(&self) -> Result<SaltAndNonce, RequestError> {
        let mut url = self.base_url.join(LOGIN_SCRIPT)?;
        url.set_query(Some("get-nonce=1"));

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, MONITOR_USER_AGENT)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RequestError::auth(format!(
                "nonce fetch failed: HTTP {}",
                response.status().as_u16()
            )));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn perform_login(&self, login_hash: &str, nonce: &str) -> Result<String, RequestError> {
        let mut url = self.base_url.join(LOGIN_SCRIPT)?;
        url.query_pairs_mut().append_pair("password", login_hash);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, MONITOR_USER_AGENT)
            .header(COOKIE, format!("{NONCE_COOKIE}={nonce}"))
            .timeout(self.request_timeout)
            .send()
            .await?;

        if response.status().as_u16() != 200 {
            return Err(RequestError::auth(format!(
                "login rejected: HTTP {}",
                response.status().as_u16()
            )));
        }

        find_set_cookie(response.headers(), AUTH_COOKIE)
            .ok_or_else(|| RequestError::protocol("login response missing session cookie"))
    }
}

/// H1: hash the raw password under the server's salt, or pass a pre-salted
/// credential through unchanged. Base64 in, base64 out.
pub(crate) fn derive_base_hash(
    credential: &Credential,
    salt_b64: &str,
) -> Result<String, RequestError> {
    match credential {
        Credential::SaltedHash(hash) => Ok(String::from(hash.as_str())),
        Credential::Password(password) => {
            let salt = BASE64
                .decode(salt_b64)
                .map_err(|e| RequestError::auth(format!("malformed salt: {e}")))?;

            let mut hasher = Sha256::new();
            hasher.update(password.as_str().as_bytes());
            hasher.update(&salt);
            Ok(BASE64.encode(hasher.finalize()))
        }
    }
}

/// H2: hash the nonce together with H1. This is the transmitted value.
pub(crate) fn derive_login_hash(
    base_hash_b64: &str,
    nonce_b64: &str,
) -> Result<String, RequestError> {
    let nonce = BASE64
        .decode(nonce_b64)
        .map_err(|e| RequestError::auth(format!("malformed nonce: {e}")))?;
    let base_hash = BASE64
        .decode(base_hash_b64)
        .map_err(|e| RequestError::auth(format!("malformed password hash: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(&nonce);
    hasher.update(&base_hash);
    Ok(BASE64.encode(hasher.finalize()))
}

/// Find a Set-Cookie value by cookie name.
///
/// Some transports re-encode the cookie name, so the percent-encoded
/// spelling is accepted alongside the plain one.
pub(crate) fn find_set_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let encoded = urlencoding::encode(name).into_owned();

    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };

        let pair = match raw.split_once(';') {
            Some((first, _)) => first,
            None => raw,
        };
        let Some((cookie_name, cookie_value)) = pair.split_once('=') else {
            continue;
        };

        let cookie_name = cookie_name.trim();
        if cookie_name == name || cookie_name == encoded {
            return Some(String::from(cookie_value.trim()));
        }
    }

    None
}
