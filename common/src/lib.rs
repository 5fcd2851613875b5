pub mod args;
pub mod job;
pub mod schedule;

pub use args::parse_job_args;
pub use job::{EnvVars, ExecutionResult, JobSpec, Metadata, VarMetadata};
pub use schedule::{ScheduleSpec, ScheduledJob};

// Daemon routes
pub const METADATA_ROUTE: &str = "/metadata";
pub const EXECUTION_ROUTE: &str = "/execution";
pub const EXECUTION_LOGS_ROUTE: &str = "/execution/logs";
pub const SCHEDULE_ROUTE: &str = "/schedule";

// Identity headers sent with every request
pub const USER_EMAIL_HEADER: &str = "user-email";
pub const ACCESS_TOKEN_HEADER: &str = "access-token";
pub const CLIENT_VERSION_HEADER: &str = "client-version";

// Terminal execution statuses
pub const STATUS_SUCCEEDED: &str = "succeeded";
pub const STATUS_FAILED: &str = "failed";
