//! Docker Hub.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skopos_core::ContainerImage;

use super::{host_in_domain, untyped, ProviderKind, RegistryProvider};
use crate::error::Result;
use crate::exchange::{fetch_bearer_token, pull_scope};
use crate::request::{basic_encode, PullCredentials, RequestOptions};
use crate::schema::{Configuration, FieldSpec, Schema};

const HUB_DOMAIN: &str = "docker.io";
const HUB_REGISTRY_URL: &str = "https://registry-1.docker.io/v2";
const HUB_TOKEN_URL: &str = "https://auth.docker.io/token";
const OFFICIAL_NAMESPACE: &str = "library";

/// Docker Hub configuration. Empty for anonymous pulls.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct HubConfiguration {
    /// Account name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    /// Account password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Personal access token, used in place of the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Pre-encoded `base64(login:password)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

impl HubConfiguration {
    fn secret(&self) -> Option<&str> {
        self.password.as_deref().or(self.token.as_deref())
    }
}

/// Docker Hub provider.
#[derive(Clone)]
pub struct Hub {
    name: String,
    config: HubConfiguration,
    http: reqwest::Client,
    token_url: String,
}

impl Hub {
    /// Creates a provider from a validated configuration.
    pub fn new(name: impl Into<String>, config: HubConfiguration, http: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            config,
            http,
            token_url: HUB_TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Configuration schema.
    #[must_use]
    pub fn schema() -> Schema {
        Schema::new()
            .allow_empty()
            .field(FieldSpec::string("login"))
            .field(FieldSpec::string("password").secret())
            .field(FieldSpec::string("token").secret())
            .field(FieldSpec::string("auth").secret())
    }

    fn credentials(&self) -> Option<String> {
        if let Some(auth) = &self.config.auth {
            return Some(auth.clone());
        }
        match (&self.config.login, self.config.secret()) {
            (Some(login), Some(secret)) => Some(basic_encode(login, secret)),
            _ => None,
        }
    }
}

/// Official images live under `library/`.
fn repository(name: &str) -> String {
    if name.contains('/') {
        name.to_string()
    } else {
        format!("{OFFICIAL_NAMESPACE}/{name}")
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("name", &self.name)
            .field("login", &self.config.login)
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryProvider for Hub {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Hub
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn configuration(&self) -> Configuration {
        untyped(&self.config)
    }

    fn matches(&self, image: &ContainerImage) -> bool {
        let host = image.host();
        host.is_empty() || host_in_domain(host, HUB_DOMAIN)
    }

    fn normalize_image(&self, image: &ContainerImage) -> ContainerImage {
        let mut normalized = image.clone();
        normalized.registry.url = HUB_REGISTRY_URL.to_string();
        normalized.name = repository(&image.name);
        normalized
    }

    async fn authenticate(
        &self,
        image: &ContainerImage,
        mut options: RequestOptions,
    ) -> Result<RequestOptions> {
        let url = format!(
            "{}?service=registry.docker.io&scope={}&grant_type=password",
            self.token_url,
            pull_scope(&repository(&image.name))
        );
        let credentials = self.credentials();
        let token =
            fetch_bearer_token(&self.http, &self.id(), &url, credentials.as_deref()).await?;
        options.set_bearer(&token)?;
        Ok(options)
    }

    fn auth_pull(&self) -> Option<PullCredentials> {
        match (&self.config.login, self.config.secret()) {
            (Some(login), Some(secret)) => Some(PullCredentials::new(login, secret)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hub(config: HubConfiguration) -> Hub {
        Hub::new("private", config, reqwest::Client::new())
    }

    #[test]
    fn test_schema_accepts_anonymous() {
        assert!(Hub::schema().validate(&json!("")).unwrap().is_empty());
    }

    #[test]
    fn test_match() {
        let provider = hub(HubConfiguration::default());
        assert!(provider.matches(&ContainerImage::new("nginx", "")));
        assert!(provider.matches(&ContainerImage::new("nginx", "docker.io")));
        assert!(provider.matches(&ContainerImage::new("nginx", "registry-1.docker.io")));
        assert!(!provider.matches(&ContainerImage::new("nginx", "ghcr.io")));
        assert!(!provider.matches(&ContainerImage::new("nginx", "notdocker.io")));
    }

    #[test]
    fn test_normalize_adds_library_prefix() {
        let provider = hub(HubConfiguration::default());
        let normalized = provider.normalize_image(&ContainerImage::new("nginx", "docker.io"));
        assert_eq!(normalized.registry.url, "https://registry-1.docker.io/v2");
        assert_eq!(normalized.name, "library/nginx");
        assert_eq!(provider.normalize_image(&normalized), normalized);

        let scoped = provider.normalize_image(&ContainerImage::new("grafana/grafana", ""));
        assert_eq!(scoped.name, "grafana/grafana");
    }

    #[test]
    fn test_credentials_precedence() {
        let with_token = hub(HubConfiguration {
            login: Some("login".to_string()),
            token: Some("token".to_string()),
            ..HubConfiguration::default()
        });
        assert_eq!(with_token.credentials(), Some(basic_encode("login", "token")));
        assert_eq!(with_token.auth_pull(), Some(PullCredentials::new("login", "token")));

        let with_auth = hub(HubConfiguration {
            login: Some("login".to_string()),
            password: Some("password".to_string()),
            auth: Some("YXV0aA==".to_string()),
            ..HubConfiguration::default()
        });
        assert_eq!(with_auth.credentials().as_deref(), Some("YXV0aA=="));
        assert_eq!(
            with_auth.auth_pull(),
            Some(PullCredentials::new("login", "password"))
        );
    }

    #[tokio::test]
    async fn test_authenticate_exchanges_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(query_param("service", "registry.docker.io"))
            .and(query_param("scope", "repository:library/nginx:pull"))
            .and(query_param("grant_type", "password"))
            .and(header(
                "authorization",
                format!("Basic {}", basic_encode("login", "password")).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "hub-token" })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = hub(HubConfiguration {
            login: Some("login".to_string()),
            password: Some("password".to_string()),
            ..HubConfiguration::default()
        })
        .with_token_url(format!("{}/token", server.uri()));

        let options = provider
            .authenticate(&ContainerImage::new("nginx", "docker.io"), RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(options.authorization(), Some("Bearer hub-token"));
    }

    #[tokio::test]
    async fn test_authenticate_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "anon" })))
            .mount(&server)
            .await;

        let provider = hub(HubConfiguration::default())
            .with_token_url(format!("{}/token", server.uri()));
        let options = provider
            .authenticate(&ContainerImage::new("grafana/grafana", ""), RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(options.authorization(), Some("Bearer anon"));

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }
}
