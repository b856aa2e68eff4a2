//! HTTP discovery client

use std::time::Duration;

use contracts::{ChannelName, ChannelResolver, ContractError, Endpoint, ResolvedServer};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of `GET /servers?channel=<name>`
#[derive(Debug, Clone, Deserialize)]
pub struct ServersResponse {
    pub cluster: String,
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub websockets_servers: Vec<String>,
}

impl ServersResponse {
    /// Parse the `host:port` candidates, dropping malformed entries.
    pub fn into_resolved(self, channel: &ChannelName) -> ResolvedServer {
        let endpoints = self
            .servers
            .iter()
            .filter_map(|raw| match raw.parse::<Endpoint>() {
                Ok(endpoint) => Some(endpoint),
                Err(e) => {
                    warn!(channel = %channel, server = %raw, error = %e, "Ignoring malformed server");
                    None
                }
            })
            .collect();

        ResolvedServer {
            cluster: self.cluster,
            endpoints,
        }
    }
}

/// Resolver backed by the discovery HTTP service
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpResolver {
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ContractError::Other(format!("failed to build http client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn servers_url(&self) -> String {
        format!("{}/servers", self.base_url.trim_end_matches('/'))
    }

    async fn fetch(&self, channel: &ChannelName) -> Result<ServersResponse, reqwest::Error> {
        self.client
            .get(self.servers_url())
            .query(&[("channel", channel.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

impl ChannelResolver for HttpResolver {
    #[instrument(name = "resolve_channel", skip(self), fields(channel = %channel))]
    async fn resolve(&self, channel: &ChannelName) -> Result<ResolvedServer, ContractError> {
        debug!(url = %self.servers_url(), "Querying discovery service");

        let body = self
            .fetch(channel)
            .await
            .map_err(|e| ContractError::resolve(channel.as_str(), e.to_string()))?;
        let resolved = body.into_resolved(channel);

        match resolved.primary() {
            Some(server) => info!(
                channel = %channel.join_target(),
                server = %server,
                cluster = %resolved.cluster,
                "Channel hosted"
            ),
            None => warn!(channel = %channel, cluster = %resolved.cluster, "No servers listed"),
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    fn channel(name: &str) -> ChannelName {
        ChannelName::parse(name).unwrap()
    }

    async fn servers(
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        match params.get("channel").map(String::as_str) {
            Some("foo") => Ok(Json(serde_json::json!({
                "cluster": "aws",
                "servers": ["10.0.0.1:6667", "10.0.0.2:80"],
                "websockets_servers": ["10.0.0.1:80"]
            }))),
            Some("empty") => Ok(Json(serde_json::json!({ "cluster": "aws", "servers": [] }))),
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    async fn spawn_discovery() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route("/servers", get(servers));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{addr}/")
    }

    fn local_resolver(base: String) -> HttpResolver {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpResolver::with_client(client, base)
    }

    #[test]
    fn test_parse_body() {
        let body: ServersResponse = serde_json::from_str(
            r#"{"cluster":"main","servers":["irc.example:6667","bogus"],"websockets_servers":[]}"#,
        )
        .unwrap();
        let resolved = body.into_resolved(&channel("foo"));
        assert_eq!(resolved.cluster, "main");
        assert_eq!(resolved.endpoints, vec![Endpoint::new("irc.example", 6667)]);
    }

    #[test]
    fn test_parse_body_missing_lists() {
        let body: ServersResponse = serde_json::from_str(r#"{"cluster":"main"}"#).unwrap();
        assert!(body.into_resolved(&channel("foo")).primary().is_none());
    }

    #[test]
    fn test_servers_url_trims_slash() {
        let resolver = HttpResolver::new("http://tmi.example/").unwrap();
        assert_eq!(resolver.servers_url(), "http://tmi.example/servers");
    }

    #[tokio::test]
    async fn test_resolve_over_http() {
        let resolver = local_resolver(spawn_discovery().await);

        let resolved = resolver.resolve(&channel("#Foo")).await.unwrap();
        assert_eq!(resolved.cluster, "aws");
        assert_eq!(resolved.primary(), Some(&Endpoint::new("10.0.0.1", 6667)));
        assert_eq!(resolved.endpoints.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_empty_server_list() {
        let resolver = local_resolver(spawn_discovery().await);
        let resolved = resolver.resolve(&channel("empty")).await.unwrap();
        assert!(resolved.endpoints.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_http_error() {
        let resolver = local_resolver(spawn_discovery().await);
        let err = resolver.resolve(&channel("missing")).await.unwrap_err();
        assert!(matches!(err, ContractError::Resolve { ref channel, .. } if channel == "missing"));
    }
}
