//! Remote config var storage.
//!
//! [`ConfigStore`] is what the sync operations talk to. [`HerokuClient`] is the
//! implementation backed by the Heroku platform API:
//!
//! - `GET /apps/{app}/config-vars` returns a JSON object of name to value.
//! - `PATCH /apps/{app}/config-vars` sets every key in the body; a `null`
//!   value removes the var.

use std::collections::BTreeMap;

use reqwest::{
  blocking::{Client, Response},
  header::ACCEPT,
};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::parse::ConfigMap;

pub const DEFAULT_API_URL: &str = "https://api.heroku.com";

const API_ACCEPT: &str = "application/vnd.heroku+json; version=3";
const USER_AGENT: &str = concat!("heroku-config/", env!("CARGO_PKG_VERSION"));

/// Fetches and updates an app's config vars.
pub trait ConfigStore {
  /// Returns every config var currently set on `app`.
  fn fetch(&self, app: &str) -> Result<ConfigMap, RemoteError>;

  /// Sets each var in `vars` on `app`, leaving other vars untouched.
  fn push(&self, app: &str, vars: &ConfigMap) -> Result<(), RemoteError>;

  /// Removes `keys` from `app`.
  fn unset(&self, app: &str, keys: &[String]) -> Result<(), RemoteError>;
}

/// Blocking client for the Heroku config vars endpoint.
#[derive(Debug, Clone)]
pub struct HerokuClient {
  http: Client,
  base_url: String,
  token: String,
}

impl HerokuClient {
  /// Creates a client for the public Heroku API.
  pub fn new<T: Into<String>>(token: T) -> Result<Self, RemoteError> {
    Self::with_base_url(token, DEFAULT_API_URL)
  }

  /// Creates a client for the API served at `base_url`.
  pub fn with_base_url<T, U>(token: T, base_url: U) -> Result<Self, RemoteError>
  where
    T: Into<String>,
    U: Into<String>,
  {
    let http = Client::builder().user_agent(USER_AGENT).build()?;
    let base_url = base_url.into().trim_end_matches('/').to_string();

    Ok(Self {
      http,
      base_url,
      token: token.into(),
    })
  }

  fn config_vars_url(&self, app: &str) -> String {
    format!("{}/apps/{}/config-vars", self.base_url, app)
  }

  fn patch(&self, app: &str, body: &BTreeMap<&str, Option<&str>>) -> Result<(), RemoteError> {
    let response = self
      .http
      .patch(self.config_vars_url(app))
      .bearer_auth(&self.token)
      .header(ACCEPT, API_ACCEPT)
      .json(body)
      .send()?;

    check_status(response)?;
    Ok(())
  }
}

impl ConfigStore for HerokuClient {
  fn fetch(&self, app: &str) -> Result<ConfigMap, RemoteError> {
    #[cfg(feature = "tracing")]
    debug!(app, "Fetching config vars");

    let response = self
      .http
      .get(self.config_vars_url(app))
      .bearer_auth(&self.token)
      .header(ACCEPT, API_ACCEPT)
      .send()?;

    // The API reports unset-but-present vars as null.
    let vars: BTreeMap<String, Option<String>> = check_status(response)?.json()?;
    Ok(
      vars
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect(),
    )
  }

  fn push(&self, app: &str, vars: &ConfigMap) -> Result<(), RemoteError> {
    if vars.is_empty() {
      return Ok(());
    }

    #[cfg(feature = "tracing")]
    info!(app, count = vars.len(), "Setting config vars");

    let body = vars
      .iter()
      .map(|(key, value)| (key.as_str(), Some(value.as_str())))
      .collect();
    self.patch(app, &body)
  }

  fn unset(&self, app: &str, keys: &[String]) -> Result<(), RemoteError> {
    if keys.is_empty() {
      return Ok(());
    }

    #[cfg(feature = "tracing")]
    info!(app, count = keys.len(), "Removing config vars");

    let body = keys.iter().map(|key| (key.as_str(), None)).collect();
    self.patch(app, &body)
  }
}

fn check_status(response: Response) -> Result<Response, RemoteError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().unwrap_or_default();
  Err(RemoteError::Status {
    status: status.as_u16(),
    body,
  })
}

/// Errors that can occur while talking to the remote store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
  /// Transport or decoding failure
  #[error("Request failed: {0}")]
  Http(#[from] reqwest::Error),
  /// The API answered with a non-success status
  #[error("API returned status {status}: {body}")]
  Status { status: u16, body: String },
}
