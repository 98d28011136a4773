//! AWS Elastic Container Registry, private registries and the public gallery.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use skopos_core::{ContainerImage, ValidationError};
use tokio::sync::Mutex;

use super::{untyped, ProviderContext, ProviderKind, RegistryProvider};
use crate::error::{RegistryError, Result};
use crate::exchange::fetch_bearer_token;
use crate::request::{PullCredentials, RequestOptions};
use crate::schema::{Configuration, FieldSpec, Schema};
use crate::token::{AuthToken, TokenCache};

/// Hostname of the ECR public gallery.
pub const ECR_PUBLIC_GALLERY_HOSTNAME: &str = "public.ecr.aws";

const PUBLIC_TOKEN_URL: &str = "https://public.ecr.aws/token/";

/// Lifetime assumed when the IAM response carries no expiry.
const DEFAULT_TOKEN_TTL_HOURS: i64 = 12;

/// ECR configuration. Empty for anonymous use.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct EcrConfiguration {
    /// IAM access key id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accesskeyid: Option<String>,
    /// IAM secret access key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secretaccesskey: Option<String>,
    /// AWS region of the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Account id restricting which registries match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accountid: Option<String>,
    /// Opt-in matching of the public gallery.
    #[serde(default)]
    pub public: bool,
}

/// Static IAM credentials handed to an [`EcrTokenSource`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EcrCredentials {
    /// IAM access key id.
    pub access_key_id: String,
    /// IAM secret access key.
    pub secret_access_key: String,
    /// AWS region.
    pub region: String,
}

impl fmt::Debug for EcrCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcrCredentials")
            .field("access_key_id", &skopos_core::mask(&self.access_key_id))
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// Exchanges IAM credentials for an ECR authorization token.
#[async_trait]
pub trait EcrTokenSource: Send + Sync + fmt::Debug {
    /// Fetches a fresh token. `provider` is the id used in errors.
    async fn fetch_token(&self, provider: &str, credentials: &EcrCredentials) -> Result<AuthToken>;
}

/// [`EcrTokenSource`] calling `GetAuthorizationToken` through the AWS SDK.
///
/// One SDK client is built per credential set and reused on every refresh.
#[derive(Debug, Default)]
pub struct AwsEcrTokenSource {
    clients: Mutex<HashMap<EcrCredentials, aws_sdk_ecr::Client>>,
}

impl AwsEcrTokenSource {
    /// Creates a token source with no client built yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self, credentials: &EcrCredentials) -> aws_sdk_ecr::Client {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(credentials) {
            return client.clone();
        }

        let static_credentials = aws_sdk_ecr::config::Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            None,
            None,
            "skopos",
        );
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(static_credentials)
            .region(aws_config::Region::new(credentials.region.clone()))
            .load()
            .await;
        let client = aws_sdk_ecr::Client::new(&aws_config);

        tracing::debug!(region = %credentials.region, "Built ECR client");
        clients.insert(credentials.clone(), client.clone());
        client
    }
}

#[async_trait]
impl EcrTokenSource for AwsEcrTokenSource {
    async fn fetch_token(&self, provider: &str, credentials: &EcrCredentials) -> Result<AuthToken> {
        let response = self
            .client(credentials)
            .await
            .get_authorization_token()
            .send()
            .await
            .map_err(|e| {
                RegistryError::authentication(
                    provider,
                    aws_sdk_ecr::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        let data = response.authorization_data().first().ok_or_else(|| {
            RegistryError::authentication(provider, "no authorization data returned")
        })?;
        let value = data.authorization_token().ok_or_else(|| {
            RegistryError::authentication(provider, "no authorization token in response")
        })?;
        let expires_at = data
            .expires_at()
            .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
            .unwrap_or_else(|| Utc::now() + Duration::hours(DEFAULT_TOKEN_TTL_HOURS));

        tracing::info!(provider, region = %credentials.region, %expires_at, "Fetched ECR authorization token");
        Ok(AuthToken::new(value, expires_at))
    }
}

/// AWS ECR provider.
pub struct Ecr {
    name: String,
    config: EcrConfiguration,
    private_host: Regex,
    http: reqwest::Client,
    tokens: Arc<dyn EcrTokenSource>,
    cache: TokenCache,
    public_token_url: String,
}

impl Ecr {
    /// Creates a provider from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Configuration`] if the account id cannot be
    /// turned into a hostname pattern.
    pub fn new(
        name: impl Into<String>,
        config: EcrConfiguration,
        context: &ProviderContext,
    ) -> Result<Self> {
        let name = name.into();
        let account = config
            .accountid
            .as_deref()
            .map_or_else(|| ".*".to_string(), regex::escape);
        let private_host = Regex::new(&format!(r"^{account}\.dkr\.ecr\..*\.amazonaws\.com$"))
            .map_err(|e| RegistryError::Configuration {
                provider: format!("{}.{name}", ProviderKind::Ecr),
                source: ValidationError::format("accountid", e.to_string()),
            })?;

        Ok(Self {
            name,
            config,
            private_host,
            http: context.http.clone(),
            tokens: Arc::clone(&context.ecr_tokens),
            cache: TokenCache::new(),
            public_token_url: PUBLIC_TOKEN_URL.to_string(),
        })
    }

    /// Overrides the public gallery token endpoint.
    #[must_use]
    pub fn with_public_token_url(mut self, url: impl Into<String>) -> Self {
        self.public_token_url = url.into();
        self
    }

    /// Configuration schema.
    #[must_use]
    pub fn schema() -> Schema {
        Schema::new()
            .allow_empty()
            .field(FieldSpec::string("accesskeyid").required().secret())
            .field(FieldSpec::string("secretaccesskey").required().secret())
            .field(FieldSpec::string("region").required())
            .field(FieldSpec::string("accountid"))
            .field(FieldSpec::bool("public").default_value(false))
    }

    /// Account id used for the IAM exchange: configured, else the first label
    /// of the image's registry host.
    #[must_use]
    pub fn account_id(&self, image: &ContainerImage) -> Option<String> {
        self.config.accountid.clone().or_else(|| {
            image
                .host()
                .split('.')
                .next()
                .filter(|label| !label.is_empty())
                .map(str::to_string)
        })
    }

    fn credentials(&self) -> Option<EcrCredentials> {
        match (
            &self.config.accesskeyid,
            &self.config.secretaccesskey,
            &self.config.region,
        ) {
            (Some(access_key_id), Some(secret_access_key), Some(region)) => Some(EcrCredentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                region: region.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Debug for Ecr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ecr")
            .field("name", &self.name)
            .field("public", &self.config.public)
            .field("private_host", &self.private_host.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryProvider for Ecr {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ecr
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn configuration(&self) -> Configuration {
        untyped(&self.config)
    }

    fn matches(&self, image: &ContainerImage) -> bool {
        let host = image.host();
        if host == ECR_PUBLIC_GALLERY_HOSTNAME {
            return self.config.public;
        }
        self.private_host.is_match(host)
    }

    async fn authenticate(
        &self,
        image: &ContainerImage,
        mut options: RequestOptions,
    ) -> Result<RequestOptions> {
        let id = self.id();

        if image.host() == ECR_PUBLIC_GALLERY_HOSTNAME {
            let token = fetch_bearer_token(&self.http, &id, &self.public_token_url, None).await?;
            options.set_bearer(&token)?;
            return Ok(options);
        }

        let Some(credentials) = self.credentials() else {
            tracing::debug!(provider = %id, "No ECR credentials configured, request left anonymous");
            return Ok(options);
        };

        tracing::debug!(
            provider = %id,
            account = self.account_id(image).as_deref().unwrap_or_default(),
            "Authorizing ECR request"
        );
        let token = self
            .cache
            .get_or_fetch(|| self.tokens.fetch_token(&id, &credentials))
            .await?;
        options.set_basic(&token.value)?;
        Ok(options)
    }

    fn auth_pull(&self) -> Option<PullCredentials> {
        self.credentials()
            .map(|c| PullCredentials::new(c.access_key_id, c.secret_access_key))
    }
}
