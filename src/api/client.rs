//! Blocking HTTP client for the VictoriaMetrics API.

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Certificate, Identity, Url};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::error::ApiError;
use super::types::{ApiResponse, LabelSet, QueryResult};
use super::QueryApi;
use crate::config::Config;
use crate::utils::time::format_unix_seconds;

/// Longest error body echoed back in [`ApiError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Auth {
    None,
    Basic { user: String, password: String },
    Bearer(String),
}

#[derive(Debug, Clone)]
pub struct VmClient {
    http: Client,
    base: Url,
    auth: Auth,
}

impl VmClient {
    /// Build a client from the resolved configuration.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let base = base_url(&config.server.url, &config.server.path_prefix)?;
        let auth = match config.auth.kind.as_str() {
            "" => Auth::None,
            "basic" => Auth::Basic {
                user: config.auth.user.clone(),
                password: config.auth.password.clone(),
            },
            "bearer" => Auth::Bearer(config.auth.token.clone()),
            other => return Err(ApiError::UnsupportedAuth(other.to_string())),
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let timeout = config.server.timeout;
        let mut builder = Client::builder()
            .user_agent(concat!("vm-metrics/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout((!timeout.is_zero()).then_some(timeout));

        let tls = &config.tls;
        if !tls.ca.is_empty() {
            let pem = read_pem("CA certificate", &tls.ca)?;
            for cert in Certificate::from_pem_bundle(&pem)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        match (tls.cert.is_empty(), tls.key.is_empty()) {
            (false, false) => {
                let mut pem = read_pem("client certificate", &tls.cert)?;
                pem.push(b'\n');
                pem.extend(read_pem("client key", &tls.key)?);
                builder = builder.identity(Identity::from_pem(&pem)?);
            }
            (true, true) => {}
            _ => tracing::warn!("Both tls.cert and tls.key are needed for client auth; ignoring"),
        }
        if tls.skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        tracing::debug!("API base URL {}", base);
        Ok(Self { http: builder.build()?, base, auth })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `base` + path segments, each segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn get(&self, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        tracing::debug!("GET {}", url);
        self.authorize(self.http.get(url))
    }

    pub(crate) fn post(&self, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        tracing::debug!("POST {}", url);
        self.authorize(self.http.post(url))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Basic { user, password } => request.basic_auth(user, Some(password)),
            Auth::Bearer(token) => request.bearer_auth(token),
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self.get(segments).query(params).send()?;
        let status = response.status();
        let body = response.text()?;
        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => {
                Err(ApiError::Status { status: status.as_u16(), body: truncate(body) })
            }
            Err(err) => Err(ApiError::Decode(err)),
        }
    }
}

impl QueryApi for VmClient {
    fn query(&self, query: &str, time: Option<DateTime<Utc>>) -> Result<QueryResult, ApiError> {
        let mut params = vec![("query", query.to_string())];
        if let Some(time) = time {
            params.push(("time", format_unix_seconds(&time)));
        }
        self.get_json(&["api", "v1", "query"], &params)
    }

    fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<QueryResult, ApiError> {
        let params = [
            ("query", query.to_string()),
            ("start", format_unix_seconds(&start)),
            ("end", format_unix_seconds(&end)),
            ("step", format_step(step)),
        ];
        self.get_json(&["api", "v1", "query_range"], &params)
    }

    fn series(
        &self,
        matches: &[String],
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<LabelSet>, ApiError> {
        let mut params: Vec<_> = matches.iter().map(|m| ("match[]", m.clone())).collect();
        params.extend(time_range(start, end));
        self.get_json(&["api", "v1", "series"], &params)
    }

    fn labels(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, ApiError> {
        self.get_json(&["api", "v1", "labels"], &time_range(start, end))
    }

    fn label_values(
        &self,
        label: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, ApiError> {
        self.get_json(&["api", "v1", "label", label, "values"], &time_range(start, end))
    }
}

/// `url` without trailing `/`, then `/` + `path_prefix` trimmed of `/`.
fn base_url(url: &str, path_prefix: &str) -> Result<Url, ApiError> {
    let mut base = url.trim_end_matches('/').to_string();
    let prefix = path_prefix.trim_matches('/');
    if !prefix.is_empty() {
        base.push('/');
        base.push_str(prefix);
    }
    let invalid = |reason: String| ApiError::InvalidUrl { url: url.to_string(), reason };

    let parsed = Url::parse(&base).map_err(|err| invalid(err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    Ok(parsed)
}

pub(crate) fn time_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(start) = start {
        params.push(("start", format_unix_seconds(&start)));
    }
    if let Some(end) = end {
        params.push(("end", format_unix_seconds(&end)));
    }
    params
}

/// Step in seconds; whole seconds are sent without a fraction.
fn format_step(step: Duration) -> String {
    if step.subsec_nanos() == 0 {
        step.as_secs().to_string()
    } else {
        format!("{:.3}", step.as_secs_f64())
    }
}

fn read_pem(what: &'static str, path: &str) -> Result<Vec<u8>, ApiError> {
    fs::read(path).map_err(|source| ApiError::TlsFile { what, path: Path::new(path).into(), source })
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body.trim().to_string()
}

/// Turn a non-2xx response into [`ApiError::Status`].
pub(crate) fn error_for_status(response: Response, accepted: &[u16]) -> Result<Response, ApiError> {
    let status = response.status().as_u16();
    if accepted.contains(&status) {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ApiError::Status { status, body: truncate(body) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::defaults().expect("defaults")
    }

    #[test]
    fn test_base_url_joins_prefix() {
        let url = base_url("http://vm:8428/", "/select/0/prometheus/").unwrap();
        assert_eq!(url.as_str(), "http://vm:8428/select/0/prometheus");
        assert_eq!(base_url("http://vm:8428", "").unwrap().as_str(), "http://vm:8428/");
    }

    #[test]
    fn test_base_url_rejects_garbage() {
        assert!(matches!(base_url("not a url", ""), Err(ApiError::InvalidUrl { .. })));
        assert!(matches!(base_url("ftp://vm", ""), Err(ApiError::InvalidUrl { .. })));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let mut cfg = config();
        cfg.server.path_prefix = "prom".to_string();
        let client = VmClient::new(&cfg).unwrap();
        assert_eq!(
            client.endpoint(&["api", "v1", "label", "a/b", "values"]).as_str(),
            "http://localhost:8428/prom/api/v1/label/a%2Fb/values"
        );

        cfg.server.path_prefix.clear();
        let client = VmClient::new(&cfg).unwrap();
        assert_eq!(client.endpoint(&["api", "v1", "query"]).as_str(), "http://localhost:8428/api/v1/query");
    }

    #[test]
    fn test_auth_types() {
        let mut cfg = config();
        cfg.auth.kind = "basic".to_string();
        assert!(VmClient::new(&cfg).is_ok());
        cfg.auth.kind = "digest".to_string();
        let err = VmClient::new(&cfg).unwrap_err();
        assert!(err.to_string().contains("digest"));
    }

    #[test]
    fn test_missing_ca_file_is_reported() {
        let mut cfg = config();
        cfg.tls.ca = "/nonexistent/ca.pem".to_string();
        match VmClient::new(&cfg) {
            Err(ApiError::TlsFile { what, .. }) => assert_eq!(what, "CA certificate"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_format_step() {
        assert_eq!(format_step(Duration::from_secs(60)), "60");
        assert_eq!(format_step(Duration::from_millis(1500)), "1.500");
    }

    #[test]
    fn test_truncate_long_bodies() {
        let body = "x".repeat(MAX_ERROR_BODY + 10);
        assert_eq!(truncate(body).len(), MAX_ERROR_BODY + 3);
    }
}
