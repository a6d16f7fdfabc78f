// # DNS v2 Control Plane Client
//
// This crate provides a ControlPlaneClient for OpenStack Designate and other
// control planes speaking the same DNS v2 API.
//
// ## Scope
//
// - One HTTP request per trait call
// - HTTP timeout configured (30 seconds)
// - Status codes mapped onto recordset_core::Error kinds
// - Updates send only the changed attributes
// - No retries, no waiting, no caching (the reconciler owns all three)
//
// ## Trust Level: Untrusted (Control Plane Client)
//
// **Allowed Capabilities**:
// - Perform HTTP/HTTPS calls to the configured endpoint only
// - Parse control-plane responses
//
// **Forbidden Capabilities**:
// - Spawn tasks or threads
// - Retry or sleep
// - Hold state beyond a single request
//
// ## Security Requirements
//
// - The auth token NEVER appears in logs or Debug output
// - Construction fails if the token is empty
//
// ## API Reference
//
// - Create: POST `/v2/zones/:zone_id/recordsets`
// - Show:   GET `/v2/zones/:zone_id/recordsets/:recordset_id`
// - Update: PUT `/v2/zones/:zone_id/recordsets/:recordset_id`
// - Delete: DELETE `/v2/zones/:zone_id/recordsets/:recordset_id`

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use recordset_core::traits::ControlPlaneClient;
use recordset_core::{Error, RecordSet, RecordSetPatch, RecordSetSpec, RecordStatus, RecordType, Result};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the auth token
const AUTH_HEADER: &str = "X-Auth-Token";

const CLIENT_NAME: &str = "designate";

/// Body of a create request
#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    records: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

/// Record set as the DNS v2 API returns it
#[derive(Debug, Deserialize)]
struct WireRecordSet {
    id: String,
    zone_id: String,
    #[serde(default)]
    zone_name: Option<String>,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    records: Vec<String>,
    #[serde(default)]
    ttl: Option<u32>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl WireRecordSet {
    fn into_record_set(self) -> Result<RecordSet> {
        let record_type: RecordType = self.record_type.parse().map_err(|_| {
            Error::control_plane(
                CLIENT_NAME,
                format!("malformed response: unknown record type '{}'", self.record_type),
            )
        })?;

        Ok(RecordSet {
            zone_id: self.zone_id,
            id: self.id,
            name: self.name,
            record_type,
            records: self.records,
            // null means the zone default applies
            ttl: self.ttl,
            description: self.description,
            status: self
                .status
                .map(RecordStatus::from)
                .unwrap_or(RecordStatus::Active),
            zone_name: self.zone_name,
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            updated_at: self.updated_at.as_deref().and_then(parse_timestamp),
        })
    }
}

/// Designate reports naive UTC timestamps; accept RFC 3339 as well
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// DNS v2 control plane client
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot. Waiting for consistency, retries and
/// drift detection live in `recordset_core::Reconciler`.
///
/// # Security
///
/// The Debug implementation does NOT expose the auth token.
pub struct DesignateClient {
    /// Base URL; path segments are appended percent-encoded
    endpoint: Url,

    /// Auth token
    /// ⚠️ NEVER log this value
    auth_token: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the auth token
impl std::fmt::Debug for DesignateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignateClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("auth_token", &"<REDACTED>")
            .finish()
    }
}

impl DesignateClient {
    /// Create a new client
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Base URL of the DNS service, e.g. `https://dns.example.net:9001`
    /// - `auth_token`: Token sent as `X-Auth-Token`
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If either value is empty or the endpoint is not a base URL
    /// - `Err(Error::Http)`: If the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let auth_token = auth_token.into();

        if endpoint.trim().is_empty() {
            return Err(Error::config("DNS endpoint cannot be empty"));
        }
        if auth_token.is_empty() {
            return Err(Error::config("DNS auth token cannot be empty"));
        }

        let endpoint = Url::parse(endpoint.trim())
            .map_err(|e| Error::config(format!("Invalid DNS endpoint '{}': {}", endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::config(format!(
                "DNS endpoint '{}' is not a base URL",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            auth_token,
            client,
        })
    }

    /// Base URL requests are sent to
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    fn collection_url(&self, zone_id: &str) -> Result<Url> {
        self.url_for(&["v2", "zones", zone_id, "recordsets"])
    }

    fn record_url(&self, zone_id: &str, id: &str) -> Result<Url> {
        self.url_for(&["v2", "zones", zone_id, "recordsets", id])
    }

    /// Append `segments` to the endpoint path, escaping `/`, `?`, `#` and friends
    fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("DNS endpoint '{}' is not a base URL", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and map non-success statuses onto error kinds
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .header(AUTH_HEADER, &self.auth_token)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(match status {
            StatusCode::NOT_FOUND => Error::not_found(format!("{}: {}", what, error_text)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::auth(format!(
                "{} rejected: invalid token or insufficient permissions. Status: {}",
                what, status
            )),
            StatusCode::TOO_MANY_REQUESTS => {
                Error::rate_limited(format!("{} rate limited. Status: {}", what, status))
            }
            s if s.is_server_error() => Error::control_plane(
                CLIENT_NAME,
                format!("server error (transient) during {}: {} - {}", what, status, error_text),
            ),
            _ => Error::control_plane(
                CLIENT_NAME,
                format!("{} failed: {} - {}", what, status, error_text),
            ),
        })
    }

    async fn parse_record_set(response: Response) -> Result<RecordSet> {
        let wire: WireRecordSet = response.json().await.map_err(|e| {
            Error::control_plane(CLIENT_NAME, format!("malformed response: {}", e))
        })?;
        wire.into_record_set()
    }
}

#[async_trait]
impl ControlPlaneClient for DesignateClient {
    /// Create a record set
    ///
    /// ```http
    /// POST /v2/zones/:zone_id/recordsets
    /// X-Auth-Token: <token>
    /// {"name": "...", "type": "A", "records": [...], "ttl": 3000}
    /// ```
    async fn create(&self, zone_id: &str, spec: &RecordSetSpec) -> Result<String> {
        tracing::info!(
            "Creating {} record set {} in zone {}",
            spec.record_type,
            spec.name,
            zone_id
        );

        let body = CreateRequest {
            name: &spec.name,
            record_type: spec.record_type.as_str(),
            records: &spec.records,
            ttl: spec.ttl,
            description: spec.description.as_deref(),
        };

        let response = self
            .send(
                self.client.post(self.collection_url(zone_id)?).json(&body),
                "create record set",
            )
            .await?;

        let created = Self::parse_record_set(response).await?;
        tracing::debug!("Record set created with ID {}", created.id);
        Ok(created.id)
    }

    async fn get(&self, zone_id: &str, id: &str) -> Result<RecordSet> {
        let response = self
            .send(self.client.get(self.record_url(zone_id, id)?), "get record set")
            .await?;
        Self::parse_record_set(response).await
    }

    /// Update the attributes present in `patch`
    ///
    /// ```http
    /// PUT /v2/zones/:zone_id/recordsets/:recordset_id
    /// {"ttl": 1500}
    /// ```
    async fn update(&self, zone_id: &str, id: &str, patch: &RecordSetPatch) -> Result<RecordSet> {
        tracing::info!(
            "Updating record set {} in zone {} ({:?})",
            id,
            zone_id,
            patch.fields()
        );

        let response = self
            .send(
                self.client.put(self.record_url(zone_id, id)?).json(patch),
                "update record set",
            )
            .await?;
        Self::parse_record_set(response).await
    }

    async fn delete(&self, zone_id: &str, id: &str) -> Result<()> {
        tracing::info!("Deleting record set {} in zone {}", id, zone_id);

        self.send(
            self.client.delete(self.record_url(zone_id, id)?),
            "delete record set",
        )
        .await?;
        Ok(())
    }

    fn client_name(&self) -> &'static str {
        CLIENT_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use recordset_core::{OperationContext, Reconciler, ReconcilerConfig};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record_set_json(status: &str) -> serde_json::Value {
        json!({
            "id": "f7b10e9b-0cae-4a91-b162-562bc6096648",
            "zone_id": "2150b1bf-dee2-4221-9d85-11f7886fb15f",
            "zone_name": "example.com.",
            "name": "acc-test.example.com.",
            "type": "A",
            "records": ["10.1.0.0"],
            "ttl": 3000,
            "description": "a record set",
            "status": status,
            "action": "CREATE",
            "version": 1,
            "created_at": "2014-10-24T19:59:44.000000",
            "updated_at": null
        })
    }

    const ZONE: &str = "2150b1bf-dee2-4221-9d85-11f7886fb15f";
    const RECORD: &str = "f7b10e9b-0cae-4a91-b162-562bc6096648";

    async fn client_for(server: &MockServer) -> DesignateClient {
        DesignateClient::new(server.uri(), "secret_token_12345").unwrap()
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            DesignateClient::new("https://dns.example.net", ""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DesignateClient::new("", "token"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_auth_token_not_exposed_in_debug() {
        let client = DesignateClient::new("https://dns.example.net/", "secret_token_12345").unwrap();

        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("DesignateClient"));
        assert_eq!(client.endpoint(), "https://dns.example.net/");
    }

    #[test]
    fn test_endpoint_must_be_a_base_url() {
        assert!(matches!(
            DesignateClient::new("not a url", "token"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DesignateClient::new("mailto:dns@example.net", "token"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_urls_escape_identifiers() {
        let client = DesignateClient::new("https://dns.example.net/dns/", "token").unwrap();
        assert_eq!(
            client.record_url("zone?x", "rs#1").unwrap().as_str(),
            "https://dns.example.net/dns/v2/zones/zone%3Fx/recordsets/rs%231"
        );
        assert_eq!(
            client.collection_url("a/b").unwrap().as_str(),
            "https://dns.example.net/dns/v2/zones/a%2Fb/recordsets"
        );
    }

    #[test]
    fn test_client_name() {
        let client = DesignateClient::new("https://dns.example.net", "token").unwrap();
        assert_eq!(client.client_name(), "designate");
        assert!(client.supports_partial_update());
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp("2014-10-24T19:59:44.000000").is_some());
        assert!(parse_timestamp("2014-10-24T19:59:44Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_create_posts_spec_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v2/zones/{}/recordsets", ZONE)))
            .and(header("X-Auth-Token", "secret_token_12345"))
            .and(body_json(json!({
                "name": "acc-test.example.com.",
                "type": "A",
                "records": ["10.1.0.0"],
                "ttl": 3000,
                "description": "a record set"
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(record_set_json("PENDING")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let spec = RecordSetSpec::new(ZONE, "acc-test.example.com.", RecordType::A, ["10.1.0.0"])
            .with_ttl(3000)
            .with_description("a record set");

        assert_eq!(client.create(ZONE, &spec).await.unwrap(), RECORD);
    }

    #[tokio::test]
    async fn test_get_parses_record_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v2/zones/{}/recordsets/{}", ZONE, RECORD)))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_set_json("ACTIVE")))
            .mount(&server)
            .await;

        let record_set = client_for(&server).await.get(ZONE, RECORD).await.unwrap();
        assert_eq!(record_set.id, RECORD);
        assert_eq!(record_set.record_type, RecordType::A);
        assert_eq!(record_set.ttl, Some(3000));
        assert_eq!(record_set.status, RecordStatus::Active);
        assert_eq!(record_set.zone_name.as_deref(), Some("example.com."));
        assert!(record_set.created_at.is_some());
        assert!(record_set.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_null_ttl_reads_as_unset() {
        let server = MockServer::start().await;
        let mut body = record_set_json("ACTIVE");
        body["ttl"] = serde_json::Value::Null;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let record_set = client_for(&server).await.get(ZONE, RECORD).await.unwrap();
        assert_eq!(record_set.ttl, None);
        assert_eq!(record_set.attributes()["ttl"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_sent_when_remote_ttl_is_unset() {
        let server = MockServer::start().await;
        let mut unset = record_set_json("ACTIVE");
        unset["ttl"] = serde_json::Value::Null;
        let mut zero = record_set_json("ACTIVE");
        zero["ttl"] = json!(0);

        // First read sees the zone default, reads after the PUT see 0
        Mock::given(method("GET"))
            .and(path(format!("/v2/zones/{}/recordsets/{}", ZONE, RECORD)))
            .respond_with(ResponseTemplate::new(200).set_body_json(unset))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v2/zones/{}/recordsets/{}", ZONE, RECORD)))
            .respond_with(ResponseTemplate::new(200).set_body_json(zero.clone()))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("/v2/zones/{}/recordsets/{}", ZONE, RECORD)))
            .and(body_json(json!({ "ttl": 0 })))
            .respond_with(ResponseTemplate::new(202).set_body_json(zero))
            .expect(1)
            .mount(&server)
            .await;

        let client: Arc<dyn ControlPlaneClient> = Arc::new(client_for(&server).await);
        let config = ReconcilerConfig::new().with_poll_interval(Duration::from_millis(5));
        let reconciler = Reconciler::new(client, config).unwrap();
        let desired = RecordSetSpec::new(ZONE, "acc-test.example.com.", RecordType::A, ["10.1.0.0"])
            .with_ttl(0)
            .with_description("a record set");

        let updated = reconciler
            .update(&format!("{}/{}", ZONE, RECORD), &desired, &OperationContext::new())
            .await
            .unwrap();
        assert_eq!(updated.ttl, Some(0));
    }

    #[tokio::test]
    async fn test_identifiers_are_escaped_on_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/zones/zone%3Fx/recordsets/rs%231"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_set_json("ACTIVE")))
            .expect(1)
            .mount(&server)
            .await;

        let record_set = client_for(&server).await.get("zone?x", "rs#1").await.unwrap();
        assert_eq!(record_set.id, RECORD);
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("/v2/zones/{}/recordsets/{}", ZONE, RECORD)))
            .and(body_json(json!({ "ttl": 1500 })))
            .respond_with(ResponseTemplate::new(202).set_body_json(record_set_json("PENDING")))
            .expect(1)
            .mount(&server)
            .await;

        let patch = RecordSetPatch {
            ttl: Some(1500),
            ..Default::default()
        };
        let record_set = client_for(&server)
            .await
            .update(ZONE, RECORD, &patch)
            .await
            .unwrap();
        assert_eq!(record_set.status, RecordStatus::Pending);
    }

    #[tokio::test]
    async fn test_delete_accepts_202() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("/v2/zones/{}/recordsets/{}", ZONE, RECORD)))
            .respond_with(ResponseTemplate::new(202).set_body_json(record_set_json("PENDING")))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).await.delete(ZONE, RECORD).await.unwrap();
    }

    #[tokio::test]
    async fn test_status_code_mapping() {
        let cases = [
            (404, "not_found"),
            (401, "auth"),
            (403, "auth"),
            (429, "rate_limited"),
            (500, "control_plane"),
            (400, "control_plane"),
        ];

        for (status, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&server)
                .await;

            let err = client_for(&server).await.get(ZONE, RECORD).await.unwrap_err();
            let kind = match err {
                Error::NotFound(_) => "not_found",
                Error::Authentication(_) => "auth",
                Error::RateLimited(_) => "rate_limited",
                Error::ControlPlane { .. } => "control_plane",
                other => panic!("unexpected error for {}: {:?}", status, other),
            };
            assert_eq!(kind, expected, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        match client_for(&server).await.get(ZONE, RECORD).await {
            Err(Error::ControlPlane { client, message }) => {
                assert_eq!(client, "designate");
                assert!(message.contains("malformed response"));
            }
            other => panic!("expected ControlPlane, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_record_type_is_malformed() {
        let server = MockServer::start().await;
        let mut body = record_set_json("ACTIVE");
        body["type"] = json!("NAPTR");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        assert!(matches!(
            client_for(&server).await.get(ZONE, RECORD).await,
            Err(Error::ControlPlane { .. })
        ));
    }
}
