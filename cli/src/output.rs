use comfy_table::Table;
use common::{ExecutionResult, Metadata, ScheduledJob, VarMetadata};
use std::collections::HashMap;

use crate::config::{self, ClientConfig};

pub fn jobs_table(jobs: &[Metadata]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Name", "Description", "Args", "Secrets"]);
    for job in jobs {
        let args: Vec<&str> = job.env_vars.args.iter().map(|a| a.name.as_str()).collect();
        let secrets: Vec<&str> = job.env_vars.secrets.iter().map(|s| s.name.as_str()).collect();
        table.add_row(vec![
            job.name.clone(),
            job.description.clone(),
            args.join(", "),
            secrets.join(", "),
        ]);
    }
    table
}

pub fn job_details(job: &Metadata) -> String {
    let mut lines = vec![
        format!("{:<20} {}", "Name", job.name),
        format!("{:<20} {}", "Description", job.description),
        format!("{:<20} {}", "Image", job.image_name),
        format!("{:<20} {}", "Author", job.author),
        format!("{:<20} {}", "Contributors", job.contributors),
        format!("{:<20} {}", "Organization", job.organization),
        format!("{:<20} [{}]", "Authorized Groups", job.authorized_groups.join(", ")),
    ];
    push_vars(&mut lines, "Args", &job.env_vars.args);
    push_vars(&mut lines, "Secrets", &job.env_vars.secrets);
    lines.join("\n")
}

/// YAML listing of a job's arguments, written by `proclink template`.
pub fn args_template(job: &Metadata) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&job.env_vars.args)
}

fn push_vars(lines: &mut Vec<String>, title: &str, vars: &[VarMetadata]) {
    if vars.is_empty() {
        lines.push(format!("{:<20} {}", title, "(none)"));
        return;
    }
    lines.push(String::new());
    lines.push(title.to_string());
    lines.extend(vars.iter().map(|v| format!("  {:<18} {}", v.name, v.description)));
}

pub fn schedules_table(jobs: &[ScheduledJob]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Job", "Group", "Tags", "Cron", "Enabled"]);
    for job in jobs {
        table.add_row(vec![
            job.id.to_string(),
            job.name.clone(),
            job.group.clone(),
            job.tags.clone(),
            job.cron_expression.clone(),
            job.enabled.to_string(),
        ]);
    }
    table
}

pub fn scheduled_job_details(job: &ScheduledJob) -> String {
    let mut lines = vec![
        format!("{:<20} {}", "ID", job.id),
        format!("{:<20} {}", "Job", job.name),
        format!("{:<20} {}", "Group", job.group),
        format!("{:<20} {}", "Tags", job.tags),
        format!("{:<20} {}", "Cron", job.cron_expression),
        format!("{:<20} {}", "Notify", job.notification_emails),
        format!("{:<20} {}", "Enabled", job.enabled),
    ];
    if job.args.is_empty() {
        lines.push(format!("{:<20} {}", "Args", "(none)"));
    } else {
        lines.push("Args".to_string());
        lines.extend(sorted_args(&job.args).into_iter().map(|(k, v)| format!("  {:<18} {}", k, v)));
    }
    lines.join("\n")
}

pub fn execution_summary(result: &ExecutionResult) -> String {
    [
        format!("{:<20} {}", "ID", result.execution_id),
        format!("{:<20} {}", "Name", result.execution_name),
        format!("{:<20} {}", "Job", result.job_name),
        format!("{:<20} {}", "Status", result.status),
        format!("{:<20} {}", "Updated At", result.updated_at),
    ]
    .join("\n")
}

pub fn config_view(config: &ClientConfig) -> String {
    [
        format!("{:<35} {}", config::HOST_KEY, config.host),
        format!("{:<35} {}", config::EMAIL_KEY, config.email),
        format!("{:<35} {}", config::ACCESS_TOKEN_KEY, mask(&config.access_token)),
        format!("{:<35} {}", config::CONNECTION_TIMEOUT_KEY, config.connection_timeout.as_secs()),
        format!("{:<35} {}", config::POLL_COUNT_KEY, config.poll_count),
    ]
    .join("\n")
}

fn sorted_args(args: &HashMap<String, String>) -> Vec<(&String, &String)> {
    let mut pairs: Vec<_> = args.iter().collect();
    pairs.sort();
    pairs
}

fn mask(secret: &str) -> String {
    match secret.chars().count() {
        0 => "(not set)".to_string(),
        n if n <= 4 => "*".repeat(n),
        n => {
            let tail: String = secret.chars().skip(n - 4).collect();
            format!("{}{}", "*".repeat(n - 4), tail)
        }
    }
}
