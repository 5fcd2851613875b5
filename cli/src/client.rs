use async_trait::async_trait;
use common::{ExecutionResult, JobSpec, Metadata, ScheduleSpec, ScheduledJob};
use log::{debug, info};
use reqwest::{Client, Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tokio::io::AsyncWrite;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, ConfigProvider, Credentials};
use crate::error::{classify_status, classify_transport, ClientError};
use crate::logs::{self, LogStreamer, StreamEnd};
use crate::poller::{ExecutionStatusSource, StatusPoller, DEFAULT_BACKOFF_STEP};
use crate::request::RequestBuilder;

/// One method per daemon capability. Configuration is resolved again on
/// every call, so credential changes apply without rebuilding the client.
#[derive(Clone)]
pub struct ProtocolClient {
    config: Arc<dyn ConfigProvider>,
    client_version: String,
    poll_backoff: Duration,
}

impl ProtocolClient {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            config,
            client_version: crate::CLIENT_VERSION.to_string(),
            poll_backoff: DEFAULT_BACKOFF_STEP,
        }
    }

    pub fn with_client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = version.into();
        self
    }

    pub fn with_poll_backoff(mut self, step: Duration) -> Self {
        self.poll_backoff = step;
        self
    }

    pub fn client_version(&self) -> &str {
        &self.client_version
    }

    pub async fn list_jobs(&self) -> Result<Vec<Metadata>, ClientError> {
        let body = self.send(Method::GET, common::METADATA_ROUTE, StatusCode::OK).await?;
        decode(&body)
    }

    /// Look up a single job by exact name in the daemon's job list.
    pub async fn find_job(&self, name: &str) -> Result<Option<Metadata>, ClientError> {
        let jobs = self.list_jobs().await?;
        Ok(jobs.into_iter().find(|job| job.name == name))
    }

    pub async fn execute_job(&self, job: &JobSpec) -> Result<ExecutionResult, ClientError> {
        let body = self
            .send_json(Method::POST, common::EXECUTION_ROUTE, job, StatusCode::CREATED)
            .await?;
        let result: ExecutionResult = decode(&body)?;
        info!("Execution {} ({}) created for job {}", result.execution_id, result.execution_name, job.name);
        Ok(result)
    }

    /// Returns the id the daemon assigned to the new schedule. A duplicate
    /// schedule comes back as a generic HTTP error carrying the daemon's body.
    pub async fn schedule_job(&self, schedule: &ScheduleSpec) -> Result<u64, ClientError> {
        let body = self
            .send_json(Method::POST, common::SCHEDULE_ROUTE, schedule, StatusCode::CREATED)
            .await?;
        let scheduled: ScheduledJob = decode(&body)?;
        info!("Job {} scheduled with id {}", schedule.name, scheduled.id);
        Ok(scheduled.id)
    }

    pub async fn list_scheduled_jobs(&self) -> Result<Vec<ScheduledJob>, ClientError> {
        let body = self.send(Method::GET, common::SCHEDULE_ROUTE, StatusCode::OK).await?;
        decode(&body)
    }

    pub async fn describe_scheduled_job(&self, id: u64) -> Result<ScheduledJob, ClientError> {
        let path = format!("{}/{}", common::SCHEDULE_ROUTE, id);
        let body = self.send(Method::GET, &path, StatusCode::OK).await?;
        decode(&body)
    }

    pub async fn remove_scheduled_job(&self, id: u64) -> Result<(), ClientError> {
        let path = format!("{}/{}", common::SCHEDULE_ROUTE, id);
        self.send(Method::DELETE, &path, StatusCode::OK).await?;
        info!("Scheduled job {} removed", id);
        Ok(())
    }

    pub async fn get_execution_status(&self, execution_id: u64) -> Result<ExecutionResult, ClientError> {
        let path = format!("{}/{}/status", common::EXECUTION_ROUTE, execution_id);
        let body = self.send(Method::GET, &path, StatusCode::OK).await?;
        decode(&body)
    }

    /// Poll until the execution succeeds or fails, using the configured poll count.
    pub async fn wait_for_execution(&self, execution_id: u64) -> Result<ExecutionResult, ClientError> {
        let config = self.load_config()?;
        StatusPoller::new(config.poll_count)
            .with_backoff_step(self.poll_backoff)
            .poll(self, execution_id)
            .await
    }

    /// Stream logs into `sink` until the daemon ends the stream or Ctrl-C is pressed.
    pub async fn stream_logs<W>(&self, execution_id: u64, sink: W) -> Result<StreamEnd, ClientError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.stream_logs_until(execution_id, sink, logs::ctrl_c()).await
    }

    pub async fn stream_logs_until<W, I>(&self, execution_id: u64, sink: W, interrupt: I) -> Result<StreamEnd, ClientError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
        I: Future<Output = ()>,
    {
        let config = self.load_config()?;
        let credentials = config.credentials();
        LogStreamer::new(&credentials, &self.client_version, config.connection_timeout)
            .stream(execution_id, sink, interrupt)
            .await
    }

    fn load_config(&self) -> Result<ClientConfig, ClientError> {
        self.config.load().map_err(|e| ClientError::Config(format!("{:#}", e)))
    }

    async fn send(&self, method: Method, path: &str, expected: StatusCode) -> Result<Vec<u8>, ClientError> {
        let config = self.load_config()?;
        let credentials = config.credentials();
        let http = http_client(&config)?;
        let request = RequestBuilder::new(&credentials, &self.client_version).build(&http, method, path)?;
        execute(&http, request, &credentials, expected).await
    }

    async fn send_json<B>(&self, method: Method, path: &str, body: &B, expected: StatusCode) -> Result<Vec<u8>, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let config = self.load_config()?;
        let credentials = config.credentials();
        let http = http_client(&config)?;
        let request = RequestBuilder::new(&credentials, &self.client_version).build_json(&http, method, path, body)?;
        execute(&http, request, &credentials, expected).await
    }
}

fn http_client(config: &ClientConfig) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(config.connection_timeout)
        .build()
        .map_err(|e| ClientError::Request(e.to_string()))
}

/// Send `request`; anything but `expected` goes through the classifier.
async fn execute(http: &Client, request: Request, credentials: &Credentials, expected: StatusCode) -> Result<Vec<u8>, ClientError> {
    debug!("{} {}", request.method(), request.url());
    let response = http.execute(request).await.map_err(|e| classify_transport(&e))?;
    let status = response.status();
    let body = response.bytes().await.map_err(|e| classify_transport(&e))?;
    debug!("Daemon answered {} ({} bytes)", status, body.len());

    if status != expected {
        let text = String::from_utf8_lossy(&body).into_owned();
        return Err(classify_status(status.as_u16(), text, credentials));
    }
    Ok(body.to_vec())
}

#[async_trait]
impl ExecutionStatusSource for ProtocolClient {
    async fn execution_status(&self, execution_id: u64) -> Result<ExecutionResult, ClientError> {
        self.get_execution_status(execution_id).await
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    Ok(serde_json::from_slice(body)?)
}
