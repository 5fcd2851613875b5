use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use common::{JobSpec, Metadata, ScheduleSpec};
use proclink::config::{ConfigFile, ConfigProvider, FileConfigProvider};
use proclink::{output, ClientError, ProtocolClient, StreamEnd};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about = "Run, schedule and follow jobs on a remote execution daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List jobs the daemon can run
    List,
    /// Show a job's description, arguments and secrets
    Describe {
        /// Name of the job
        name: String,
    },
    /// Write a YAML template of a job's arguments
    Template {
        /// Name of the job
        name: String,
        /// Where to write the template
        file: PathBuf,
    },
    /// Execute a job, stream its logs and wait for the final status
    Execute {
        /// Name of the job
        name: String,
        /// Job arguments as KEY=VALUE
        args: Vec<String>,
    },
    /// Stream logs of an execution
    Logs {
        id: u64,
    },
    /// Show the status of an execution
    Status {
        id: u64,
    },
    /// Manage scheduled jobs
    Schedule {
        #[command(subcommand)]
        action: ScheduleCommands,
    },
    /// View or change client configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ScheduleCommands {
    /// Schedule a job
    Create {
        /// Name of the job
        name: String,
        /// Cron expression
        #[arg(long)]
        cron: String,
        /// Comma separated tags
        #[arg(short, long)]
        tags: String,
        /// Group owning the schedule
        #[arg(short, long)]
        group: String,
        /// Comma separated emails to notify
        #[arg(short, long, default_value = "")]
        notify: String,
        /// Job arguments as KEY=VALUE
        args: Vec<String>,
    },
    /// List scheduled jobs
    List,
    /// Show a scheduled job
    Describe {
        id: u64,
    },
    /// Remove a scheduled job
    Remove {
        id: u64,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set values, e.g. `PROCLINK_HOST=daemon:5000 EMAIL_ID=me@example.com`
    Set {
        pairs: Vec<String>,
    },
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            if let Some(err) = e.downcast_ref::<ClientError>() {
                if let Some(detail) = err.detail() {
                    eprintln!("{}", detail);
                }
                if let Some(hint) = err.hint() {
                    eprintln!("{}", hint);
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let provider = FileConfigProvider::from_default_location()?;
    let client = ProtocolClient::new(Arc::new(provider.clone()));

    match cli.command {
        Commands::List => {
            let jobs = client.list_jobs().await?;
            println!("{}", output::jobs_table(&jobs));
        }
        Commands::Describe { name } => {
            let job = find_job(&client, &name).await?;
            println!("{}", output::job_details(&job));
            println!("\nTo run {}:\nproclink execute {} ARG_ONE=foo ARG_TWO=bar", name, name);
        }
        Commands::Template { name, file } => {
            let job = find_job(&client, &name).await?;
            let template = output::args_template(&job).context("Failed to render template")?;
            std::fs::write(&file, template)
                .with_context(|| format!("Failed to write template file: {:?}", file))?;
            println!("Template for {} written to {}", name, file.display());
        }
        Commands::Execute { name, args } => {
            let job = JobSpec::new(name, common::parse_job_args(&args)?);
            let execution = client.execute_job(&job).await?;
            println!("Execution created\n{}\n", output::execution_summary(&execution));

            println!("Streaming logs");
            if client.stream_logs(execution.execution_id, tokio::io::stdout()).await? == StreamEnd::Interrupted {
                println!(
                    "\nStopped following execution {}. Check it later with `proclink status {}`.",
                    execution.execution_id, execution.execution_id
                );
                return Ok(ExitCode::FAILURE);
            }

            let result = client.wait_for_execution(execution.execution_id).await?;
            println!("\n{}", output::execution_summary(&result));
            if !result.succeeded() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Logs { id } => {
            match client.stream_logs(id, tokio::io::stdout()).await? {
                StreamEnd::Closed => println!("Log stream for execution {} closed.", id),
                StreamEnd::Interrupted => println!("\nStopped following execution {}.", id),
            }
        }
        Commands::Status { id } => {
            let result = client.get_execution_status(id).await?;
            println!("{}", output::execution_summary(&result));
        }
        Commands::Schedule { action } => match action {
            ScheduleCommands::Create { name, cron, tags, group, notify, args } => {
                let spec = ScheduleSpec {
                    name,
                    tags,
                    cron_expression: cron,
                    notification_emails: notify,
                    group,
                    args: common::parse_job_args(&args)?,
                };
                let id = client.schedule_job(&spec).await?;
                println!("Scheduled {} with ID {}", spec.name, id);
            }
            ScheduleCommands::List => {
                let jobs = client.list_scheduled_jobs().await?;
                println!("{}", output::schedules_table(&jobs));
            }
            ScheduleCommands::Describe { id } => {
                let job = client.describe_scheduled_job(id).await?;
                println!("{}", output::scheduled_job_details(&job));
            }
            ScheduleCommands::Remove { id } => {
                client.remove_scheduled_job(id).await?;
                println!("Scheduled job {} removed", id);
            }
        },
        Commands::Config { action } => return configure(&provider, action),
    }

    Ok(ExitCode::SUCCESS)
}

async fn find_job(client: &ProtocolClient, name: &str) -> anyhow::Result<Metadata> {
    client.find_job(name).await?.ok_or_else(|| {
        anyhow!("proclink doesn't support job `{}`\nRun `proclink list` to view supported jobs", name)
    })
}

fn configure(provider: &FileConfigProvider, action: ConfigCommands) -> anyhow::Result<ExitCode> {
    match action {
        ConfigCommands::Set { pairs } => {
            let values = common::parse_job_args(&pairs)?;
            let mut file = ConfigFile::load_or_default(provider.path())?;
            for (key, value) in &values {
                file.set(key, value)?;
            }
            file.save(provider.path())?;
            println!("Config saved to {}", provider.path().display());
        }
        ConfigCommands::Show => {
            let config = provider.load().context("No usable configuration")?;
            println!("{}", output::config_view(&config));
        }
    }
    Ok(ExitCode::SUCCESS)
}
