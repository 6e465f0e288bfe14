/*!

AWS helpers for the test harness: an explicit, process-wide AWS session and a
small set of S3 operations (object read/write behind `s3://` URLs, and a sweep
that deletes buckets left behind by old runs).

!*/

pub mod error;
mod s3;
mod session;

pub use error::Error;
pub use s3::{cleanup_buckets, create_s3_url, parse_s3_url, read_object, write_object};
pub use session::{AwsSession, SessionSettings};
