//! HTTP implementation of the backend client
//!
//! Thin JSON-over-REST wrapper around the workstation daemon. Wire details
//! stay here; screens only ever see the trait.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::{
    AccessReport, ApiError, ApiResult, CloudApi, IdlePolicy, ImageBuild, Instance, MachineImage,
    Repository,
};

/// Client for the daemon's REST API.
pub struct HttpApi {
    base_url: String,
    client: Client,
}

impl HttpApi {
    /// Create a client against `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let resp = self.client.get(self.url(path)).send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> ApiResult<T> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(resp.url().path().to_string()));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }

    async fn check_status(resp: reqwest::Response) -> ApiResult<()> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(resp.url().path().to_string()));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CloudApi for HttpApi {
    async fn list_instances(&self) -> ApiResult<Vec<Instance>> {
        self.get_json("/instances").await
    }

    async fn start_instance(&self, id: &str) -> ApiResult<()> {
        let resp = self
            .client
            .post(self.url(&format!("/instances/{id}/start")))
            .send()
            .await?;
        Self::check_status(resp).await
    }

    async fn stop_instance(&self, id: &str) -> ApiResult<()> {
        let resp = self
            .client
            .post(self.url(&format!("/instances/{id}/stop")))
            .send()
            .await?;
        Self::check_status(resp).await
    }

    async fn delete_instance(&self, id: &str) -> ApiResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/instances/{id}")))
            .send()
            .await?;
        Self::check_status(resp).await
    }

    async fn list_images(&self) -> ApiResult<(Vec<MachineImage>, Vec<ImageBuild>)> {
        #[derive(serde::Deserialize)]
        struct ImagesResponse {
            images: Vec<MachineImage>,
            #[serde(default)]
            builds: Vec<ImageBuild>,
        }
        let resp: ImagesResponse = self.get_json("/images").await?;
        Ok((resp.images, resp.builds))
    }

    async fn build_image(&self, template: &str) -> ApiResult<ImageBuild> {
        let resp = self
            .client
            .post(self.url("/images/build"))
            .json(&serde_json::json!({ "template": template }))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn delete_image(&self, id: &str) -> ApiResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/images/{id}")))
            .send()
            .await?;
        Self::check_status(resp).await
    }

    async fn check_template_access(&self, template: &str) -> ApiResult<AccessReport> {
        self.get_json(&format!("/templates/{template}/access"))
            .await
    }

    async fn list_repositories(&self) -> ApiResult<Vec<Repository>> {
        self.get_json("/repositories").await
    }

    async fn add_repository(&self, repo: Repository) -> ApiResult<()> {
        let resp = self
            .client
            .post(self.url("/repositories"))
            .json(&repo)
            .send()
            .await?;
        Self::check_status(resp).await
    }

    async fn update_repository(&self, repo: Repository) -> ApiResult<()> {
        let resp = self
            .client
            .put(self.url(&format!("/repositories/{}", repo.name)))
            .json(&repo)
            .send()
            .await?;
        Self::check_status(resp).await
    }

    async fn delete_repository(&self, name: &str) -> ApiResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/repositories/{name}")))
            .send()
            .await?;
        Self::check_status(resp).await
    }

    async fn sync_repositories(&self) -> ApiResult<()> {
        let resp = self
            .client
            .post(self.url("/repositories/sync"))
            .send()
            .await?;
        Self::check_status(resp).await
    }

    async fn list_idle_policies(&self) -> ApiResult<Vec<IdlePolicy>> {
        self.get_json("/idle-policies").await
    }

    async fn put_idle_policy(&self, policy: IdlePolicy) -> ApiResult<()> {
        let resp = self
            .client
            .put(self.url(&format!("/idle-policies/{}", policy.id)))
            .json(&policy)
            .send()
            .await?;
        Self::check_status(resp).await
    }

    async fn delete_idle_policy(&self, id: &str) -> ApiResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/idle-policies/{id}")))
            .send()
            .await?;
        Self::check_status(resp).await
    }
}
