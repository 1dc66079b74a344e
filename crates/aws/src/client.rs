//! Shared AWS SDK configuration and service clients.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use tracing::info;

use autostate_core::config::AwsConfig;

/// Load SDK configuration for the configured region.
///
/// Static credentials and an endpoint override are applied only when set;
/// otherwise the default provider chain resolves them.
pub async fn load_sdk_config(aws: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(aws.region.clone()));

    if let (Some(key_id), Some(secret)) = (&aws.access_key_id, &aws.secret_access_key) {
        let creds = Credentials::new(
            key_id,
            secret,
            aws.session_token.clone(),
            None,
            "autostate-static",
        );
        loader = loader.credentials_provider(creds);
    }

    if let Some(ref endpoint) = aws.endpoint_url {
        if !endpoint.is_empty() {
            loader = loader.endpoint_url(normalize_endpoint(endpoint));
        }
    }

    let sdk_config = loader.load().await;
    info!(
        region = %aws.region,
        static_credentials = aws.has_static_credentials(),
        endpoint = aws.endpoint_url.as_deref().unwrap_or("default"),
        "AWS SDK config loaded"
    );
    sdk_config
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

/// One client per service the engine talks to.
#[derive(Clone, Debug)]
pub struct AwsClients {
    pub ec2: aws_sdk_ec2::Client,
    pub rds: aws_sdk_rds::Client,
    pub ecs: aws_sdk_ecs::Client,
    pub sfn: aws_sdk_sfn::Client,
}

impl AwsClients {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            ec2: aws_sdk_ec2::Client::new(sdk_config),
            rds: aws_sdk_rds::Client::new(sdk_config),
            ecs: aws_sdk_ecs::Client::new(sdk_config),
            sfn: aws_sdk_sfn::Client::new(sdk_config),
        }
    }

    pub async fn from_config(aws: &AwsConfig) -> Self {
        Self::new(&load_sdk_config(aws).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_gets_scheme() {
        assert_eq!(normalize_endpoint("localhost:4566"), "https://localhost:4566");
        assert_eq!(normalize_endpoint("http://localhost:4566"), "http://localhost:4566");
        assert_eq!(normalize_endpoint("https://ec2.example"), "https://ec2.example");
    }
}
