//! Client for the Climate Data Store `retrieve/v1` API.
//!
//! A retrieval is a job: it is submitted, polled until the archive has produced the
//! file, and the resulting asset is then streamed to disk.

use crate::fetch::config::CdsConfig;
use crate::fetch::error::FetchError;
use crate::fetch::retriever::Retriever;
use crate::types::request::RetrievalRequest;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const INITIAL_POLL_INTERVAL: Duration = Duration::from_secs(1);
const POLL_BACKOFF: f64 = 1.5;

/// State of a job as reported by the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JobState {
    Accepted,
    Running,
    Successful,
    Failed,
    Dismissed,
    Deleted,
}

impl JobState {
    fn is_pending(self) -> bool {
        matches!(self, JobState::Accepted | JobState::Running)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Accepted => "accepted",
            JobState::Running => "running",
            JobState::Successful => "successful",
            JobState::Failed => "failed",
            JobState::Dismissed => "dismissed",
            JobState::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(rename = "jobID")]
    job_id: String,
    status: JobState,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: Asset,
}

#[derive(Debug, Deserialize)]
struct Asset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
    #[serde(rename = "file:size")]
    size: Option<u64>,
}

/// RFC 7807 problem document returned by the archive on errors.
#[derive(Debug, Default, Deserialize)]
struct ProblemDetail {
    title: Option<String>,
    detail: Option<String>,
}

#[derive(Serialize)]
struct ExecuteBody<'a> {
    inputs: &'a RetrievalRequest,
}

/// [`Retriever`] backed by the Copernicus Climate Data Store.
///
/// # Examples
///
/// ```no_run
/// use era5land::{BoundingBox, CdsClient, Month, RetrievalRequest, Retriever};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), era5land::FetchError> {
/// let client = CdsClient::from_env()?;
/// let request = RetrievalRequest::for_month(
///     &["2m_temperature".to_string()],
///     Month(2010, 1),
///     BoundingBox::GLOBAL,
/// );
/// client
///     .retrieve("reanalysis-era5-land", &request, Path::new("2010_months01_europe.grib"))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct CdsClient {
    config: CdsConfig,
    http: Client,
}

impl CdsClient {
    pub fn new(config: CdsConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    /// Creates a client from `CDSAPI_URL` / `CDSAPI_KEY` or the `~/.cdsapirc` file.
    pub fn from_env() -> Result<Self, FetchError> {
        Ok(Self::new(CdsConfig::from_env()?))
    }

    pub fn config(&self) -> &CdsConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/retrieve/v1/{}",
            self.config.url.trim_end_matches('/'),
            path
        )
    }

    async fn submit(
        &self,
        dataset: &str,
        request: &RetrievalRequest,
    ) -> Result<JobStatus, FetchError> {
        let url = self.api_url(&format!("processes/{}/execution", dataset));
        debug!("Submitting {} request for {} to {}", dataset, request.period(), url);
        let response = self
            .http
            .post(&url)
            .header(TOKEN_HEADER, &self.config.key)
            .json(&ExecuteBody { inputs: request })
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;
        read_json(url, response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        let response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, &self.config.key)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;
        read_json(url, response).await
    }

    /// Polls the job until it leaves the `accepted`/`running` states.
    async fn wait_for_job(&self, mut job: JobStatus) -> Result<JobStatus, FetchError> {
        let url = self.api_url(&format!("jobs/{}", job.job_id));
        let mut interval = INITIAL_POLL_INTERVAL.min(self.config.max_poll_interval);
        while job.status.is_pending() {
            debug!(
                "Job {} is {}, checking again in {:?}",
                job.job_id, job.status, interval
            );
            tokio::time::sleep(interval).await;
            interval = next_poll_interval(interval, self.config.max_poll_interval);
            job = self.get_json(url.clone()).await?;
        }
        debug!("Job {} finished with status {}", job.job_id, job.status);
        Ok(job)
    }

    /// Streams the asset into a temporary file next to `target`, then moves it in place.
    async fn download(&self, asset: &AssetValue, target: &Path) -> Result<(), FetchError> {
        let url = asset.href.clone();
        info!("Downloading data from {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;
        let response = check_status(url, response).await?;

        let directory = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let io_error = |e: std::io::Error| FetchError::DownloadIo(target.to_path_buf(), e);
        let (std_file, temp_path) = NamedTempFile::new_in(directory)
            .map_err(io_error)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let reader = StreamReader::new(stream);
        tokio::pin!(reader);
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(io_error)?;
        file.flush().await.map_err(io_error)?;
        drop(file);

        if let Some(expected) = asset.size {
            if expected != written {
                return Err(FetchError::SizeMismatch {
                    path: target.to_path_buf(),
                    expected,
                    found: written,
                });
            }
        }

        temp_path
            .persist(target)
            .map_err(|e| FetchError::DownloadIo(target.to_path_buf(), e.error))?;
        info!("Wrote {} bytes to {}", written, target.display());
        Ok(())
    }
}

impl Retriever for CdsClient {
    async fn retrieve(
        &self,
        dataset: &str,
        request: &RetrievalRequest,
        target: &Path,
    ) -> Result<(), FetchError> {
        let job = self.submit(dataset, request).await?;
        info!(
            "Submitted job {} for {} {}",
            job.job_id,
            dataset,
            request.period()
        );
        let job = self.wait_for_job(job).await?;
        let results_url = self.api_url(&format!("jobs/{}/results", job.job_id));

        if job.status != JobState::Successful {
            let detail = match self.get_json::<JobResults>(results_url).await {
                Err(FetchError::HttpStatus { detail, .. }) => detail,
                Err(e) => e.to_string(),
                Ok(_) => "no error detail provided".to_string(),
            };
            return Err(FetchError::JobFailed {
                job_id: job.job_id,
                status: job.status.to_string(),
                detail,
            });
        }

        let results: JobResults = self.get_json(results_url).await?;
        self.download(&results.asset.value, target).await
    }
}

fn next_poll_interval(current: Duration, max: Duration) -> Duration {
    current.mul_f64(POLL_BACKOFF).min(max)
}

async fn check_status(url: String, response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("HTTP error for {}: {}", url, status);
    Err(FetchError::HttpStatus {
        url,
        status,
        detail: problem_detail(&body),
    })
}

async fn read_json<T: DeserializeOwned>(url: String, response: Response) -> Result<T, FetchError> {
    let response = check_status(url.clone(), response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| FetchError::UnexpectedResponse {
            url,
            message: e.to_string(),
        })
}

/// Human readable message from a problem document, or the raw body if it isn't one.
fn problem_detail(body: &str) -> String {
    let problem = serde_json::from_str::<ProblemDetail>(body).unwrap_or_default();
    let parts: Vec<String> = [problem.title, problem.detail]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect();
    if parts.is_empty() {
        body.trim().chars().take(500).collect()
    } else {
        parts.join(": ")
    }
}
