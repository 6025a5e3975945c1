//! HTTP endpoint probe.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use url::Url;

use super::Probe;
use crate::error::CheckError;

/// Transport settings for HTTP probes, turned into a client once per probe
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole request timeout
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub insecure_skip_verify: bool,
    /// Redirects are reported as the redirect status unless enabled
    pub follow_redirects: bool,
    /// Reuse connections between attempts. Off, every attempt pays for DNS,
    /// connect and TLS like a first visit would.
    pub keep_alive: bool,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            insecure_skip_verify: false,
            follow_redirects: false,
            keep_alive: false,
            user_agent: concat!("vigil/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TransportConfig {
    fn build_client(&self) -> Result<reqwest::Client, CheckError> {
        let redirect = if self.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };

        let mut builder = reqwest::Client::builder();
        if !self.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }

        builder
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .danger_accept_invalid_certs(self.insecure_skip_verify)
            .redirect(redirect)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| CheckError::Client(e.to_string()))
    }
}

/// GET probe for HTTP/HTTPS endpoints
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
    up_status: StatusCode,
    must_contain: Option<String>,
    must_not_contain: Option<String>,
    headers: Vec<(String, String)>,
    basic_auth: Option<(String, String)>,
}

impl HttpProbe {
    /// Create a probe for `url`. A malformed URL or a client that cannot be
    /// built is a setup error.
    pub fn new(url: &str, transport: &TransportConfig) -> Result<Self, CheckError> {
        let parsed = Url::parse(url).map_err(|e| CheckError::InvalidTarget {
            target: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(CheckError::InvalidTarget {
                    target: url.to_string(),
                    reason: format!("unsupported scheme {other}"),
                });
            }
        }

        Ok(Self {
            url: url.to_string(),
            client: transport.build_client()?,
            up_status: StatusCode::OK,
            must_contain: None,
            must_not_contain: None,
            headers: Vec::new(),
            basic_auth: None,
        })
    }

    /// Status code a healthy endpoint answers with (default 200)
    pub fn with_up_status(mut self, status: u16) -> Result<Self, CheckError> {
        self.up_status = StatusCode::from_u16(status).map_err(|e| CheckError::InvalidTarget {
            target: self.url.clone(),
            reason: e.to_string(),
        })?;
        Ok(self)
    }

    pub fn with_must_contain(mut self, needle: impl Into<String>) -> Self {
        self.must_contain = Some(needle.into());
        self
    }

    pub fn with_must_not_contain(mut self, needle: impl Into<String>) -> Self {
        self.must_not_contain = Some(needle.into());
        self
    }

    /// Extra request header; environment references are expanded on every attempt
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Basic credentials; environment references are expanded on every attempt
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    fn needs_body(&self) -> bool {
        self.must_contain.is_some() || self.must_not_contain.is_some()
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn attempt(&self) -> Result<()> {
        // Headers are rebuilt every attempt so env expansion is fresh.
        let mut request = self.client.get(&self.url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), expand_env(value));
        }
        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(expand_env(username), Some(expand_env(password)));
        }

        let response = request.send().await?;

        let status = response.status();
        if status != self.up_status {
            bail!("response status {}", status);
        }

        if !self.needs_body() {
            return Ok(());
        }

        let body = response.text().await.context("reading response body")?;
        if let Some(needle) = &self.must_contain {
            if !body.contains(needle.as_str()) {
                bail!("response does not contain '{}'", needle);
            }
        }
        if let Some(needle) = &self.must_not_contain {
            if body.contains(needle.as_str()) {
                bail!("response contains '{}'", needle);
            }
        }

        Ok(())
    }
}

/// Replace `$VAR`, `${VAR}` and `${VAR:-default}` references with
/// environment values; unset variables expand to nothing.
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(dollar) = rest.find('$') {
        output.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            let Some(close) = braced.find('}') else {
                output.push_str(&rest[dollar..]);
                rest = "";
                break;
            };
            let value = match braced[..close].split_once(":-") {
                Some((name, default)) => {
                    lookup(name).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
                }
                None => lookup(&braced[..close]).unwrap_or_default(),
            };
            output.push_str(&value);
            rest = &braced[close + 1..];
            continue;
        }

        let len = after.find(|c| !is_name_char(c)).unwrap_or(after.len());
        let name = &after[..len];
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            output.push('$');
            rest = after;
        } else {
            output.push_str(&lookup(name).unwrap_or_default());
            rest = &after[len..];
        }
    }
    output.push_str(rest);

    output
}
