use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of a schedule request. `tags` and `notification_emails` are
/// comma separated, the way the daemon stores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSpec {
    #[serde(rename = "jobName")]
    pub name: String,
    pub tags: String,
    #[serde(rename = "cron")]
    pub cron_expression: String,
    pub notification_emails: String,
    pub group: String,
    pub args: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduledJob {
    pub id: u64,
    #[serde(rename = "jobName")]
    pub name: String,
    pub args: HashMap<String, String>,
    pub notification_emails: String,
    #[serde(rename = "cron")]
    pub cron_expression: String,
    pub tags: String,
    pub group: String,
    pub enabled: bool,
}
