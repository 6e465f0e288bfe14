use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::retry::RetryConfig;
use aws_sdk_s3::Region;
use aws_smithy_types::retry::RetryMode;
use aws_types::SdkConfig;
use log::info;
use std::future::Future;
use tokio::sync::OnceCell;

const DEFAULT_REGION: &str = "us-east-1";

/// Settings used to construct an [`AwsSession`].
#[derive(Debug, Default, Clone)]
pub struct SessionSettings {
    /// The AWS region. Defaults to `us-east-1` when not set.
    pub region: Option<String>,
    /// The shared-config profile to take credentials from. When not set, the default credential
    /// chain applies: environment variables, shared configuration files, then instance roles.
    pub profile: Option<String>,
    /// The account id the harness operates in, when known.
    pub account_id: Option<String>,
}

/// An AWS session: the loaded SDK configuration plus the service clients built from it. Construct
/// one at process start with [`AwsSession::load`] and pass it by reference to consumers, or use
/// [`AwsSession::shared`] for a process-wide instance that is initialized exactly once even when
/// first accessed concurrently.
#[derive(Debug)]
pub struct AwsSession {
    config: SdkConfig,
    s3: aws_sdk_s3::Client,
    region: String,
    account_id: Option<String>,
}

static SHARED: OnceCell<AwsSession> = OnceCell::const_new();

impl AwsSession {
    pub async fn load(settings: &SessionSettings) -> Self {
        let region = settings
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        info!("Loading AWS configuration for region '{}'", region);

        let mut config_loader = aws_config::from_env()
            .retry_config(
                RetryConfig::standard()
                    .with_retry_mode(RetryMode::Adaptive)
                    .with_max_attempts(15),
            )
            .region(Region::new(region.clone()));
        if let Some(profile) = &settings.profile {
            config_loader = config_loader.credentials_provider(
                ProfileFileCredentialsProvider::builder()
                    .profile_name(profile)
                    .build(),
            );
        }
        let config = config_loader.load().await;

        Self {
            s3: aws_sdk_s3::Client::new(&config),
            config,
            region,
            account_id: settings.account_id.clone(),
        }
    }

    /// The process-wide session. The first caller's settings win; concurrent first access still
    /// loads the configuration only once.
    pub async fn shared(settings: &SessionSettings) -> &'static Self {
        init_once(&SHARED, || Self::load(settings)).await
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn s3(&self) -> &aws_sdk_s3::Client {
        &self.s3
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }
}

/// Runs `init` at most once per cell, no matter how many callers race on first access.
async fn init_once<T, F, Fut>(cell: &OnceCell<T>, init: F) -> &T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    cell.get_or_init(init).await
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_first_access_initializes_once() {
        let cell: OnceCell<u64> = OnceCell::const_new();
        let count = AtomicUsize::new(0);

        let accesses = (0..32).map(|_| {
            init_once(&cell, || {
                count.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    42u64
                }
            })
        });
        let values = futures::future::join_all(accesses).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| **v == 42));
    }
}
