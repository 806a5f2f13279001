//! Hosting API endpoints used by deploys

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use siteship_api_types::{
    CreateDeployRequest, CreateDeployResponse, CreateProjectRequest, CurrentUser,
    DeployInfo, DeployManifestRequest, DeployManifestResponse, DeployUploadedRequest,
    GitHubRepository, GitHubRepositoryQuery, ManifestFileInfo, Project, ProjectEnvironmentRequest,
    ProjectListResponse, ProjectSource,
};

use crate::errors::CliError;
use crate::http::client::HttpClient;

/// Hosting API surface the deploy flow depends on
#[async_trait]
pub trait DeployApi: Send + Sync {
    /// `GET /cli/user`
    async fn get_current_user(&self) -> Result<CurrentUser, CliError>;

    /// `GET /cli/project/@:login/:slug`
    async fn get_project(&self, workspace_login: &str, project_slug: &str)
        -> Result<Project, CliError>;

    /// `GET /cli/workspace/@:login/projects`
    async fn get_workspace_projects(&self, workspace_login: &str)
        -> Result<Vec<Project>, CliError>;

    /// `POST /cli/project`
    async fn post_project(&self, request: &CreateProjectRequest) -> Result<Project, CliError>;

    /// `POST /cli/project/:id/deploy`, returns the new deploy id
    async fn post_deploy(&self, project_id: &str, message: Option<&str>)
        -> Result<String, CliError>;

    /// `POST /cli/project/:id/build`
    async fn post_project_build(&self, project_id: &str) -> Result<(), CliError>;

    /// `POST /cli/project/:id/environment`
    async fn post_project_environment(
        &self,
        project_id: &str,
        source: &ProjectSource,
    ) -> Result<(), CliError>;

    /// `GET /cli/deploy/:id`
    async fn get_deploy(&self, deploy_id: &str) -> Result<DeployInfo, CliError>;

    /// `POST /cli/deploy/:id/manifest`
    async fn post_deploy_manifest(
        &self,
        deploy_id: &str,
        files: &[ManifestFileInfo],
    ) -> Result<DeployManifestResponse, CliError>;

    /// `POST /cli/deploy/:id/file`
    async fn post_deploy_file(
        &self,
        deploy_id: &str,
        local_path: &Path,
        client_name: &str,
    ) -> Result<(), CliError>;

    /// `POST /cli/deploy/:id/uploaded`
    async fn post_deploy_uploaded(
        &self,
        deploy_id: &str,
        build_manifest: Option<&serde_json::Value>,
    ) -> Result<DeployInfo, CliError>;

    /// `GET /cli/github/repository`; `None` when the repository is not
    /// authorized for the account
    async fn get_github_repository(
        &self,
        query: &GitHubRepositoryQuery,
    ) -> Result<Option<GitHubRepository>, CliError>;
}

#[async_trait]
impl DeployApi for HttpClient {
    async fn get_current_user(&self) -> Result<CurrentUser, CliError> {
        self.get("/cli/user").await
    }

    async fn get_project(
        &self,
        workspace_login: &str,
        project_slug: &str,
    ) -> Result<Project, CliError> {
        let path = format!("/cli/project/@{}/{}", workspace_login, project_slug);
        self.get(&path).await
    }

    async fn get_workspace_projects(
        &self,
        workspace_login: &str,
    ) -> Result<Vec<Project>, CliError> {
        let path = format!("/cli/workspace/@{}/projects", workspace_login);
        let response: ProjectListResponse = self.get(&path).await?;
        Ok(response.results)
    }

    async fn post_project(&self, request: &CreateProjectRequest) -> Result<Project, CliError> {
        self.post("/cli/project", request).await
    }

    async fn post_deploy(
        &self,
        project_id: &str,
        message: Option<&str>,
    ) -> Result<String, CliError> {
        let path = format!("/cli/project/{}/deploy", project_id);
        let body = CreateDeployRequest {
            message: message.map(str::to_string),
        };
        let response: CreateDeployResponse = self.post(&path, &body).await?;
        Ok(response.id)
    }

    async fn post_project_build(&self, project_id: &str) -> Result<(), CliError> {
        let path = format!("/cli/project/{}/build", project_id);
        let _: serde_json::Value = self.post(&path, &serde_json::json!({})).await?;
        Ok(())
    }

    async fn post_project_environment(
        &self,
        project_id: &str,
        source: &ProjectSource,
    ) -> Result<(), CliError> {
        let path = format!("/cli/project/{}/environment", project_id);
        let body = ProjectEnvironmentRequest {
            source: source.clone(),
        };
        let _: serde_json::Value = self.post(&path, &body).await?;
        Ok(())
    }

    async fn get_deploy(&self, deploy_id: &str) -> Result<DeployInfo, CliError> {
        self.get(&format!("/cli/deploy/{}", deploy_id)).await
    }

    async fn post_deploy_manifest(
        &self,
        deploy_id: &str,
        files: &[ManifestFileInfo],
    ) -> Result<DeployManifestResponse, CliError> {
        let path = format!("/cli/deploy/{}/manifest", deploy_id);
        let body = DeployManifestRequest {
            files: files.to_vec(),
        };
        self.post(&path, &body).await
    }

    async fn post_deploy_file(
        &self,
        deploy_id: &str,
        local_path: &Path,
        client_name: &str,
    ) -> Result<(), CliError> {
        let path = format!("/cli/deploy/{}/file", deploy_id);
        let contents = tokio::fs::read(local_path).await?;
        let file_name = client_name.rsplit('/').next().unwrap_or(client_name).to_string();
        let form = Form::new()
            .text("client_name", client_name.to_string())
            .part("file", Part::bytes(contents).file_name(file_name));
        let _: serde_json::Value = self.post_multipart(&path, form).await?;
        Ok(())
    }

    async fn post_deploy_uploaded(
        &self,
        deploy_id: &str,
        build_manifest: Option<&serde_json::Value>,
    ) -> Result<DeployInfo, CliError> {
        let path = format!("/cli/deploy/{}/uploaded", deploy_id);
        let body = DeployUploadedRequest {
            build_manifest: build_manifest.cloned(),
        };
        self.post(&path, &body).await
    }

    async fn get_github_repository(
        &self,
        query: &GitHubRepositoryQuery,
    ) -> Result<Option<GitHubRepository>, CliError> {
        match self
            .get_with_query::<GitHubRepository>("/cli/github/repository", &query.query_pairs())
            .await
        {
            Ok(repository) => Ok(Some(repository)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
