//! In-memory backend for tests and offline demo runs

use std::sync::Mutex;

use super::{
    AccessReport, ApiError, ApiResult, CloudApi, IdleAction, IdlePolicy, ImageBuild, Instance,
    InstanceState, MachineImage, Repository,
};

/// Mock backend holding its collections behind a mutex.
///
/// Every operation resolves immediately. `fail_with` poisons the next call
/// so error paths can be exercised.
#[derive(Default)]
pub struct MockApi {
    pub instances: Mutex<Vec<Instance>>,
    pub images: Mutex<Vec<MachineImage>>,
    pub builds: Mutex<Vec<ImageBuild>>,
    pub repositories: Mutex<Vec<Repository>>,
    pub idle_policies: Mutex<Vec<IdlePolicy>>,
    fail_next: Mutex<Option<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated backend used by the demo mode and integration tests.
    pub fn with_sample_data() -> Self {
        let api = Self::new();
        *api.instances.lock().unwrap() = vec![
            Instance {
                id: "i-0a1b2c3d".into(),
                name: "research-box".into(),
                template: "r-studio".into(),
                state: InstanceState::Running,
                public_ip: Some("203.0.113.10".into()),
                instance_type: "m6i.xlarge".into(),
                estimated_daily_cost: 4.61,
            },
            Instance {
                id: "i-0e4f5a6b".into(),
                name: "gpu-train".into(),
                template: "pytorch".into(),
                state: InstanceState::Stopped,
                public_ip: None,
                instance_type: "g5.2xlarge".into(),
                estimated_daily_cost: 29.09,
            },
        ];
        *api.images.lock().unwrap() = vec![MachineImage {
            id: "ami-12345678".into(),
            name: "r-studio-2024.04".into(),
            template: "r-studio".into(),
            region: "us-west-2".into(),
            state: "available".into(),
            created_at: "2024-04-02T10:00:00Z".into(),
        }];
        *api.repositories.lock().unwrap() = vec![Repository {
            name: "default".into(),
            url: "https://github.com/cloudtop/templates".into(),
            priority: 0,
            enabled: true,
            template_count: 12,
        }];
        *api.idle_policies.lock().unwrap() = vec![IdlePolicy {
            id: "pol-1".into(),
            name: "nightly-stop".into(),
            idle_minutes: 60,
            action: IdleAction::Stop,
            enabled: true,
        }];
        api
    }

    /// Make the next call fail with a transport error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_next.lock().unwrap() = Some(message.into());
    }

    fn check_poison(&self) -> ApiResult<()> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(ApiError::Transport(message));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CloudApi for MockApi {
    async fn list_instances(&self) -> ApiResult<Vec<Instance>> {
        self.check_poison()?;
        Ok(self.instances.lock().unwrap().clone())
    }

    async fn start_instance(&self, id: &str) -> ApiResult<()> {
        self.check_poison()?;
        let mut instances = self.instances.lock().unwrap();
        let instance = instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        instance.state = InstanceState::Running;
        Ok(())
    }

    async fn stop_instance(&self, id: &str) -> ApiResult<()> {
        self.check_poison()?;
        let mut instances = self.instances.lock().unwrap();
        let instance = instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        instance.state = InstanceState::Stopped;
        Ok(())
    }

    async fn delete_instance(&self, id: &str) -> ApiResult<()> {
        self.check_poison()?;
        let mut instances = self.instances.lock().unwrap();
        let before = instances.len();
        instances.retain(|i| i.id != id);
        if instances.len() == before {
            return Err(ApiError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_images(&self) -> ApiResult<(Vec<MachineImage>, Vec<ImageBuild>)> {
        self.check_poison()?;
        Ok((
            self.images.lock().unwrap().clone(),
            self.builds.lock().unwrap().clone(),
        ))
    }

    async fn build_image(&self, template: &str) -> ApiResult<ImageBuild> {
        self.check_poison()?;
        let build = ImageBuild {
            id: format!("build-{}", self.builds.lock().unwrap().len() + 1),
            template: template.to_string(),
            status: "queued".into(),
        };
        self.builds.lock().unwrap().push(build.clone());
        Ok(build)
    }

    async fn delete_image(&self, id: &str) -> ApiResult<()> {
        self.check_poison()?;
        let mut images = self.images.lock().unwrap();
        let before = images.len();
        images.retain(|i| i.id != id);
        if images.len() == before {
            return Err(ApiError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn check_template_access(&self, template: &str) -> ApiResult<AccessReport> {
        self.check_poison()?;
        Ok(AccessReport {
            template: template.to_string(),
            allowed: true,
            reason: None,
        })
    }

    async fn list_repositories(&self) -> ApiResult<Vec<Repository>> {
        self.check_poison()?;
        Ok(self.repositories.lock().unwrap().clone())
    }

    async fn add_repository(&self, repo: Repository) -> ApiResult<()> {
        self.check_poison()?;
        self.repositories.lock().unwrap().push(repo);
        Ok(())
    }

    async fn update_repository(&self, repo: Repository) -> ApiResult<()> {
        self.check_poison()?;
        let mut repos = self.repositories.lock().unwrap();
        let existing = repos
            .iter_mut()
            .find(|r| r.name == repo.name)
            .ok_or_else(|| ApiError::NotFound(repo.name.clone()))?;
        *existing = repo;
        Ok(())
    }

    async fn delete_repository(&self, name: &str) -> ApiResult<()> {
        self.check_poison()?;
        let mut repos = self.repositories.lock().unwrap();
        let before = repos.len();
        repos.retain(|r| r.name != name);
        if repos.len() == before {
            return Err(ApiError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn sync_repositories(&self) -> ApiResult<()> {
        self.check_poison()
    }

    async fn list_idle_policies(&self) -> ApiResult<Vec<IdlePolicy>> {
        self.check_poison()?;
        Ok(self.idle_policies.lock().unwrap().clone())
    }

    async fn put_idle_policy(&self, policy: IdlePolicy) -> ApiResult<()> {
        self.check_poison()?;
        let mut policies = self.idle_policies.lock().unwrap();
        match policies.iter_mut().find(|p| p.id == policy.id) {
            Some(existing) => *existing = policy,
            None => policies.push(policy),
        }
        Ok(())
    }

    async fn delete_idle_policy(&self, id: &str) -> ApiResult<()> {
        self.check_poison()?;
        let mut policies = self.idle_policies.lock().unwrap();
        let before = policies.len();
        policies.retain(|p| p.id != id);
        if policies.len() == before {
            return Err(ApiError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
