//! Gitlab Container Registry.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skopos_core::ContainerImage;

use super::{untyped, ProviderKind, RegistryProvider};
use crate::error::Result;
use crate::exchange::{fetch_bearer_token, pull_scope};
use crate::request::{basic_encode, PullCredentials, RequestOptions};
use crate::schema::{Configuration, FieldSpec, Schema};

const DEFAULT_REGISTRY_URL: &str = "https://registry.gitlab.com";
const DEFAULT_AUTH_URL: &str = "https://gitlab.com";

/// Gitlab configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct GitlabConfiguration {
    /// Registry base URL.
    pub url: String,
    /// Gitlab instance issuing registry JWTs.
    pub authurl: String,
    /// Personal access token.
    pub token: String,
}

/// Gitlab provider.
#[derive(Clone)]
pub struct Gitlab {
    name: String,
    config: GitlabConfiguration,
    http: reqwest::Client,
}

impl Gitlab {
    /// Creates a provider from a validated configuration.
    pub fn new(name: impl Into<String>, config: GitlabConfiguration, http: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            config,
            http,
        }
    }

    /// Configuration schema.
    #[must_use]
    pub fn schema() -> Schema {
        Schema::new()
            .field(FieldSpec::uri("url").default_value(DEFAULT_REGISTRY_URL))
            .field(FieldSpec::uri("authurl").default_value(DEFAULT_AUTH_URL))
            .field(FieldSpec::string("token").required().secret())
    }

    fn jwt_url(&self, image: &ContainerImage) -> String {
        format!(
            "{}/jwt/auth?service=container_registry&scope={}",
            self.config.authurl.trim_end_matches('/'),
            pull_scope(&image.name)
        )
    }
}

impl fmt::Debug for Gitlab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gitlab")
            .field("name", &self.name)
            .field("url", &self.config.url)
            .field("authurl", &self.config.authurl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryProvider for Gitlab {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gitlab
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn configuration(&self) -> Configuration {
        untyped(&self.config)
    }

    fn matches(&self, image: &ContainerImage) -> bool {
        let host = image.host();
        !host.is_empty() && self.config.url.contains(host)
    }

    async fn authenticate(
        &self,
        image: &ContainerImage,
        mut options: RequestOptions,
    ) -> Result<RequestOptions> {
        let credentials = basic_encode("", &self.config.token);
        let token =
            fetch_bearer_token(&self.http, &self.id(), &self.jwt_url(image), Some(&credentials))
                .await?;
        options.set_bearer(&token)?;
        Ok(options)
    }

    fn auth_pull(&self) -> Option<PullCredentials> {
        Some(PullCredentials::new("", self.config.token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gitlab(authurl: &str) -> Gitlab {
        Gitlab::new(
            "private",
            GitlabConfiguration {
                url: DEFAULT_REGISTRY_URL.to_string(),
                authurl: authurl.to_string(),
                token: "abcdef".to_string(),
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_schema_fills_defaults() {
        let config = Gitlab::schema().validate(&json!({ "token": "t" })).unwrap();
        assert_eq!(
            serde_json::Value::Object(config),
            json!({
                "url": "https://registry.gitlab.com",
                "authurl": "https://gitlab.com",
                "token": "t",
            })
        );
    }

    #[test]
    fn test_schema_requires_token() {
        let err = Gitlab::schema().validate(&json!({})).unwrap_err();
        assert_eq!(err.field, "token");
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_match_configured_url() {
        let provider = gitlab(DEFAULT_AUTH_URL);
        assert!(provider.matches(&ContainerImage::new("group/app", "registry.gitlab.com")));
        assert!(provider.matches(&ContainerImage::new(
            "group/app",
            "https://registry.gitlab.com/v2"
        )));
        assert!(!provider.matches(&ContainerImage::new("group/app", "gitlab.example.com")));
    }

    #[tokio::test]
    async fn test_authenticate_exchanges_token_for_jwt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwt/auth"))
            .and(query_param("service", "container_registry"))
            .and(query_param("scope", "repository:group/app:pull"))
            .and(header("authorization", "Basic OmFiY2RlZg=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "jwt" })))
            .expect(1)
            .mount(&server)
            .await;

        let options = gitlab(&format!("{}/", server.uri()))
            .authenticate(
                &ContainerImage::new("group/app", "registry.gitlab.com"),
                RequestOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(options.authorization(), Some("Bearer jwt"));
    }

    #[test]
    fn test_auth_pull_has_empty_username() {
        assert_eq!(
            gitlab(DEFAULT_AUTH_URL).auth_pull(),
            Some(PullCredentials::new("", "abcdef"))
        );
    }
}
