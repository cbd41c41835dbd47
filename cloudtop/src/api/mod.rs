//! Backend API client
//!
//! The console talks to the workstation daemon through the fixed operation
//! set of [`CloudApi`]. Screens depend only on this trait; swapping the HTTP
//! client for the in-memory mock is transparent.

mod http;
mod mock;

pub use http::HttpApi;
pub use mock::MockApi;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a workstation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    Terminated,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// A cloud workstation instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub template: String,
    pub state: InstanceState,
    #[serde(default)]
    pub public_ip: Option<String>,
    pub instance_type: String,
    /// Estimated cost per day in USD.
    #[serde(default)]
    pub estimated_daily_cost: f64,
}

/// A machine image built from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineImage {
    pub id: String,
    pub name: String,
    pub template: String,
    pub region: String,
    pub state: String,
    pub created_at: String,
}

/// An in-progress or finished image build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBuild {
    pub id: String,
    pub template: String,
    pub status: String,
}

/// A template repository entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub url: String,
    /// Lower values take precedence when templates collide.
    pub priority: i64,
    pub enabled: bool,
    #[serde(default)]
    pub template_count: usize,
}

/// What to do with an instance once it has idled past the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleAction {
    Stop,
    Hibernate,
    Terminate,
}

impl std::fmt::Display for IdleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IdleAction::Stop => "stop",
            IdleAction::Hibernate => "hibernate",
            IdleAction::Terminate => "terminate",
        };
        f.write_str(s)
    }
}

/// An idle-shutdown policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlePolicy {
    pub id: String,
    pub name: String,
    pub idle_minutes: i64,
    pub action: IdleAction,
    pub enabled: bool,
}

/// Result of a template access probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessReport {
    pub template: String,
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Errors surfaced by backend calls.
///
/// Never fatal to the loop: screens store the display string on their
/// `error` field and the user retries with an explicit refresh.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("cannot reach backend: {0}")]
    Transport(String),
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The fixed operation set every screen consumes.
#[async_trait::async_trait]
pub trait CloudApi: Send + Sync {
    async fn list_instances(&self) -> ApiResult<Vec<Instance>>;
    async fn start_instance(&self, id: &str) -> ApiResult<()>;
    async fn stop_instance(&self, id: &str) -> ApiResult<()>;
    async fn delete_instance(&self, id: &str) -> ApiResult<()>;

    async fn list_images(&self) -> ApiResult<(Vec<MachineImage>, Vec<ImageBuild>)>;
    async fn build_image(&self, template: &str) -> ApiResult<ImageBuild>;
    async fn delete_image(&self, id: &str) -> ApiResult<()>;
    async fn check_template_access(&self, template: &str) -> ApiResult<AccessReport>;

    async fn list_repositories(&self) -> ApiResult<Vec<Repository>>;
    async fn add_repository(&self, repo: Repository) -> ApiResult<()>;
    async fn update_repository(&self, repo: Repository) -> ApiResult<()>;
    async fn delete_repository(&self, name: &str) -> ApiResult<()>;
    async fn sync_repositories(&self) -> ApiResult<()>;

    async fn list_idle_policies(&self) -> ApiResult<Vec<IdlePolicy>>;
    async fn put_idle_policy(&self, policy: IdlePolicy) -> ApiResult<()>;
    async fn delete_idle_policy(&self, id: &str) -> ApiResult<()>;
}
