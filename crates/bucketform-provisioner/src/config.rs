use std::env;

use serde::{Deserialize, Serialize};

/// Region used when neither the caller nor the environment names one.
pub const DEFAULT_REGION: &str = "us-west-1";

/// Process-wide provider settings, injected into the provider at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub region: String,
    pub credentials: CredentialSource,
    /// Alternate S3 endpoint (MinIO, LocalStack). Implies path-style
    /// addressing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Inline {
        access_key_id: String,
        secret_access_key: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        session_token: Option<String>,
    },
    Profile {
        profile_name: String,
    },
    DefaultChain,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            credentials: CredentialSource::DefaultChain,
            endpoint_url: None,
        }
    }
}

impl ProviderConfig {
    /// Read `AWS_REGION`, `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
    /// `AWS_SESSION_TOKEN`, `AWS_PROFILE` and `AWS_ENDPOINT_URL`.
    ///
    /// Inline keys win over a profile; with neither, the SDK default chain
    /// is used.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credentials = match (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => CredentialSource::Inline {
                access_key_id,
                secret_access_key,
                session_token: var("AWS_SESSION_TOKEN"),
            },
            _ => match var("AWS_PROFILE") {
                Some(profile_name) => CredentialSource::Profile { profile_name },
                None => CredentialSource::DefaultChain,
            },
        };

        Self {
            region: var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            credentials,
            endpoint_url: var("AWS_ENDPOINT_URL"),
        }
    }

    /// Build an `SdkConfig` from the region and credential source.
    pub async fn build_sdk_config(&self) -> aws_config::SdkConfig {
        let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(self.region.clone()));

        match &self.credentials {
            CredentialSource::Inline {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                builder = builder.credentials_provider(aws_sdk_s3::config::Credentials::new(
                    access_key_id,
                    secret_access_key,
                    session_token.clone(),
                    None,
                    "bucketform-config",
                ));
            }
            CredentialSource::Profile { profile_name } => {
                builder = builder.profile_name(profile_name);
            }
            CredentialSource::DefaultChain => {}
        }

        if let Some(endpoint_url) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        builder.load().await
    }
}
