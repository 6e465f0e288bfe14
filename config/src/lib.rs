/*!

Environment-bound configuration for the test harness. Credentials and
settings arrive as environment variables in CI; this crate binds them to
typed structures.

!*/

mod gcp;

pub use gcp::{GcpCredentials, GcpError};
