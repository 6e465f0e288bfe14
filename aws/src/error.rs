use aws_sdk_s3::error::{
    DeleteBucketError, DeleteObjectsError, GetObjectError, ListBucketsError, ListObjectsV2Error,
    PutObjectError,
};
use aws_sdk_s3::types::SdkError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[allow(clippy::large_enum_variant)]
pub enum Error {
    #[snafu(display("Unable to delete bucket '{}': {}", bucket, source))]
    DeleteBucket {
        bucket: String,
        source: SdkError<DeleteBucketError>,
    },

    #[snafu(display("Unable to delete objects from bucket '{}': {}", bucket, source))]
    DeleteObjects {
        bucket: String,
        source: SdkError<DeleteObjectsError>,
    },

    #[snafu(display("Unable to get object '{}' from bucket '{}': {}", key, bucket, source))]
    GetObject {
        bucket: String,
        key: String,
        source: SdkError<GetObjectError>,
    },

    #[snafu(display("Unable to list buckets: {}", source))]
    ListBuckets {
        source: SdkError<ListBucketsError>,
    },

    #[snafu(display("Unable to list objects in bucket '{}': {}", bucket, source))]
    ListObjects {
        bucket: String,
        source: SdkError<ListObjectsV2Error>,
    },

    #[snafu(display("S3 URL '{}' has no bucket", url))]
    NoBucket { url: String },

    #[snafu(display("Unable to parse S3 URL '{}': {}", url, source))]
    ParseS3Url {
        url: String,
        source: url::ParseError,
    },

    #[snafu(display("Unable to put object '{}' into bucket '{}': {}", key, bucket, source))]
    PutObject {
        bucket: String,
        key: String,
        source: SdkError<PutObjectError>,
    },

    #[snafu(display(
        "Unable to read body of object '{}' from bucket '{}': {}",
        key,
        bucket,
        source
    ))]
    ReadObjectBody {
        bucket: String,
        key: String,
        source: aws_smithy_http::byte_stream::error::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
