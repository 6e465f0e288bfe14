use crate::error::{self, Error, Result};
use crate::session::AwsSession;
use aws_sdk_s3::model::{Delete, ObjectIdentifier};
use aws_sdk_s3::types::ByteStream;
use chrono::{Duration, Utc};
use log::{info, warn};
use snafu::{ensure, ResultExt};
use url::Url;

// Buckets created by the harness carry this substring in their names.
const RUN_SUBSTR: &str = "osde2e-";
// Velero backup buckets provisioned alongside test clusters.
const VELERO_SUBSTR: &str = "managed-velero";

/// Builds an `s3://` URL from a bucket and key segments, trimming stray `/` from each part.
pub fn create_s3_url<S>(bucket: &str, keys: &[S]) -> String
where
    S: AsRef<str>,
{
    let mut parts = vec!["s3:/".to_string(), bucket.trim_matches('/').to_string()];
    parts.extend(keys.iter().map(|key| key.as_ref().trim_matches('/').to_string()));
    parts.join("/")
}

/// Splits an `s3://` URL into its bucket and key. The key keeps its leading `/`, matching the URL
/// path form.
pub fn parse_s3_url(s3_url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(s3_url).context(error::ParseS3UrlSnafu { url: s3_url })?;
    let bucket = parsed.host_str().unwrap_or_default().to_string();
    ensure!(!bucket.is_empty(), error::NoBucketSnafu { url: s3_url });
    Ok((bucket, parsed.path().to_string()))
}

/// Reads the object an `s3://` URL points at.
pub async fn read_object(session: &AwsSession, s3_url: &str) -> Result<Vec<u8>> {
    let (bucket, key) = parse_s3_url(s3_url)?;
    let key = key.trim_start_matches('/');
    let result = session
        .s3()
        .get_object()
        .bucket(&bucket)
        .key(key)
        .send()
        .await
        .context(error::GetObjectSnafu {
            bucket: &bucket,
            key,
        })?;
    let body = result
        .body
        .collect()
        .await
        .context(error::ReadObjectBodySnafu {
            bucket: &bucket,
            key,
        })?;
    Ok(body.into_bytes().to_vec())
}

/// Writes `data` to the object an `s3://` URL points at.
pub async fn write_object(session: &AwsSession, s3_url: &str, data: Vec<u8>) -> Result<()> {
    let (bucket, key) = parse_s3_url(s3_url)?;
    let key = key.trim_start_matches('/');
    session
        .s3()
        .put_object()
        .bucket(&bucket)
        .key(key)
        .body(ByteStream::from(data))
        .send()
        .await
        .context(error::PutObjectSnafu {
            bucket: &bucket,
            key,
        })?;
    info!("Uploaded to {}", s3_url);
    Ok(())
}

/// Finds buckets that belong to the harness (name contains `osde2e-` or `managed-velero`) and are
/// older than `older_than`, then deletes their objects and the buckets themselves. A failure on
/// one bucket is logged and the sweep moves on. With `dry_run` the sweep only reports what it
/// would delete.
pub async fn cleanup_buckets(
    session: &AwsSession,
    older_than: Duration,
    dry_run: bool,
) -> Result<()> {
    let buckets = session
        .s3()
        .list_buckets()
        .send()
        .await
        .context(error::ListBucketsSnafu)?
        .buckets()
        .unwrap_or_default()
        .to_vec();
    let cutoff = Utc::now() - older_than;

    for bucket in buckets {
        let name = match bucket.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !name.contains(RUN_SUBSTR) && !name.contains(VELERO_SUBSTR) {
            continue;
        }
        match bucket.creation_date() {
            Some(created) if created.secs() < cutoff.timestamp() => {}
            _ => continue,
        }
        info!("Bucket '{}' is stale and will be deleted", name);
        if dry_run {
            continue;
        }
        if let Err(e) = empty_bucket(session, &name).await {
            warn!("Error deleting objects from bucket '{}', skipping: {}", name, e);
            continue;
        }
        if let Err(e) = session
            .s3()
            .delete_bucket()
            .bucket(&name)
            .send()
            .await
            .context(error::DeleteBucketSnafu { bucket: &name })
        {
            warn!("Error deleting bucket '{}': {}", name, e);
            continue;
        }
        info!("Deleted bucket '{}'", name);
    }

    Ok(())
}

/// Deletes every object in the bucket, paging through the listing.
async fn empty_bucket(session: &AwsSession, bucket: &str) -> Result<()> {
    let mut continuation_token = None;
    loop {
        let listing = session
            .s3()
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .context(error::ListObjectsSnafu { bucket })?;

        let identifiers: Vec<ObjectIdentifier> = listing
            .contents()
            .unwrap_or_default()
            .iter()
            .filter_map(|object| object.key())
            .map(|key| {
                info!("\t{}", key);
                ObjectIdentifier::builder().key(key).build()
            })
            .collect();
        if !identifiers.is_empty() {
            session
                .s3()
                .delete_objects()
                .bucket(bucket)
                .delete(Delete::builder().set_objects(Some(identifiers)).build())
                .send()
                .await
                .context(error::DeleteObjectsSnafu { bucket })?;
        }

        continuation_token = listing.next_continuation_token().map(String::from);
        if continuation_token.is_none() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_url_joins_and_trims() {
        assert_eq!(
            create_s3_url("bucket", &["key1", "key2"]),
            "s3://bucket/key1/key2"
        );
        assert_eq!(
            create_s3_url("/bucket/", &["/key1/", "key2/"]),
            "s3://bucket/key1/key2"
        );
        assert_eq!(create_s3_url("bucket", &[] as &[&str]), "s3://bucket");
    }

    #[test]
    fn parse_url_splits_bucket_and_key() {
        let (bucket, key) = parse_s3_url("s3://bucket/key1/key2").unwrap();
        assert_eq!(bucket, "bucket");
        assert_eq!(key, "/key1/key2");
    }

    #[test]
    fn url_round_trip() {
        let url = create_s3_url("osde2e-logs", &["run-1234", "junit.xml"]);
        let (bucket, key) = parse_s3_url(&url).unwrap();
        assert_eq!(bucket, "osde2e-logs");
        assert_eq!(key, "/run-1234/junit.xml");
    }

    #[test]
    fn url_without_bucket_is_an_error() {
        assert!(matches!(
            parse_s3_url("s3:///key"),
            Err(Error::NoBucket { .. })
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_s3_url("not a url"),
            Err(Error::ParseS3Url { .. })
        ));
    }
}
