use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{STATUS_FAILED, STATUS_SUCCEEDED};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarMetadata {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVars {
    pub secrets: Vec<VarMetadata>,
    pub args: Vec<VarMetadata>,
}

/// A job the daemon knows how to run, as listed by `GET /metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub image_name: String,
    pub env_vars: EnvVars,
    pub authorized_groups: Vec<String>,
    pub author: String,
    pub contributors: String,
    pub organization: String,
}

/// Body of an execute request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub args: HashMap<String, String>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, args: HashMap<String, String>) -> Self {
        Self { name: name.into(), args }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionResult {
    #[serde(rename = "id")]
    pub execution_id: u64,
    pub job_name: String,
    #[serde(rename = "name")]
    pub execution_name: String,
    pub image_tag: String,
    pub created_at: String,
    pub updated_at: String,
    pub status: String,
}

impl ExecutionResult {
    // The daemon reports statuses in upper case ("SUCCEEDED").
    pub fn succeeded(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_SUCCEEDED)
    }

    pub fn failed(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_FAILED)
    }

    /// Only `succeeded` and `failed` end polling.
    pub fn is_terminal(&self) -> bool {
        self.succeeded() || self.failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_execution_body_decodes_with_defaults() {
        let result: ExecutionResult = serde_json::from_str(r#"{"name":"exec-123"}"#).unwrap();
        assert_eq!(result.execution_name, "exec-123");
        assert_eq!(result.execution_id, 0);
        assert!(result.status.is_empty());
        assert!(!result.is_terminal());
    }

    #[test]
    fn terminal_status_ignores_case() {
        let mut result = ExecutionResult { status: "SUCCEEDED".into(), ..Default::default() };
        assert!(result.succeeded());
        assert!(result.is_terminal());

        result.status = "failed".into();
        assert!(result.failed());
        assert!(result.is_terminal());

        for status in ["WAITING", "running", "FINISHED", ""] {
            result.status = status.into();
            assert!(!result.is_terminal(), "{status} should not be terminal");
        }
    }

    #[test]
    fn metadata_decodes_nested_env_vars() {
        let body = r#"[{
            "name": "job-1",
            "description": "job description",
            "image_name": "hub.docker.com/job-1:latest",
            "env_vars": {
                "secrets": [{"name": "SECRET1", "description": "auth secret"}],
                "args": [{"name": "ARG1", "description": "Argument name"}]
            }
        }]"#;
        let list: Vec<Metadata> = serde_json::from_str(body).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].image_name, "hub.docker.com/job-1:latest");
        assert_eq!(list[0].env_vars.secrets[0].name, "SECRET1");
        assert_eq!(list[0].env_vars.args[0].description, "Argument name");
        assert!(list[0].authorized_groups.is_empty());
    }
}
