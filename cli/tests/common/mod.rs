//! In-memory hosting API and scripted effects for driving deploys end to end

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use siteship::authn::api_key::{ApiKey, KeySource};
use siteship::deploy::effects::DeployEffects;
use siteship::deploy::options::DeployOptions;
use siteship::errors::CliError;
use siteship::filesys::file::File;
use siteship::http::api::DeployApi;
use siteship::storage::deploy_config::{load_deploy_config, save_deploy_config, DeployConfig};
use siteship::storage::layout::ProjectLayout;
use siteship::telemetry::TelemetrySink;
use siteship::ui::prompt::{Prompt, Validator};
use siteship::utils::sha512_base64;
use siteship_api_types::{
    CreateProjectRequest, CurrentUser, DeployInfo, DeployManifestResponse, DeployStatus,
    GitHubRepository, GitHubRepositoryQuery, ManifestFileInfo, ManifestStatus, Project,
    ProjectOwner, ProjectSource, UploadInstruction, UploadStatus, Workspace,
};

// ---------------------------------------------------------------------------
// fixtures

pub fn workspace(login: &str, role: &str) -> Workspace {
    Workspace {
        id: format!("ws-{login}"),
        login: login.to_string(),
        name: login.to_uppercase(),
        role: role.to_string(),
        tier: None,
    }
}

pub fn user(workspaces: Vec<Workspace>) -> CurrentUser {
    CurrentUser {
        id: "u1".to_string(),
        login: "alice".to_string(),
        name: Some("Alice".to_string()),
        email: None,
        workspaces,
    }
}

pub fn project(id: &str, login: &str, slug: &str) -> Project {
    Project {
        id: id.to_string(),
        slug: slug.to_string(),
        title: slug.to_string(),
        owner: ProjectOwner {
            id: format!("ws-{login}"),
            login: login.to_string(),
            name: None,
        },
        latest_created_deploy_id: None,
        build_environment_id: None,
        source: None,
    }
}

pub fn github_repo(provider_id: &str, owner: &str, repo: &str) -> GitHubRepository {
    GitHubRepository {
        provider: "github".to_string(),
        provider_id: provider_id.to_string(),
        url: format!("https://github.com/{owner}/{repo}"),
        default_branch: Some("main".to_string()),
        name: Some(repo.to_string()),
    }
}

fn http_error(status: u16, body: &str) -> CliError {
    CliError::Http {
        status,
        body: body.to_string(),
    }
}

// ---------------------------------------------------------------------------
// hosting API

#[derive(Default)]
pub struct ApiState {
    pub user: Option<CurrentUser>,
    /// Status returned by `GET /cli/user` instead of the user
    pub user_error: Option<u16>,
    pub projects: Vec<Project>,
    pub create_project_error: Option<(u16, Vec<String>)>,
    pub deploys: HashMap<String, DeployInfo>,
    /// Deploys marked uploaded; their status advances through `processing`
    pub marked: HashSet<String>,
    /// Statuses reported while processing, `uploaded` once exhausted
    pub processing: VecDeque<DeployStatus>,
    /// Server-side content: client path -> hash
    pub stored: HashMap<String, String>,
    pub manifest_override: Option<DeployManifestResponse>,
    pub manifests: Vec<Vec<ManifestFileInfo>>,
    pub fail_uploads: HashSet<String>,
    pub uploaded_payloads: Vec<Option<Value>>,
    /// Repositories by (owner, repo)
    pub repos: Vec<(String, String, GitHubRepository)>,
    /// Lookups by name that report "not authorized" before the repo appears
    pub unauthorized_lookups: usize,
    pub environments: Vec<(String, ProjectSource)>,
    pub calls: Vec<String>,
    next_id: usize,
}

pub struct FakeApi {
    pub state: Mutex<ApiState>,
    pub upload_delay: Duration,
    active_uploads: AtomicUsize,
    pub peak_uploads: AtomicUsize,
}

impl FakeApi {
    pub fn new(user: CurrentUser) -> Self {
        Self {
            state: Mutex::new(ApiState {
                user: Some(user),
                ..Default::default()
            }),
            upload_delay: Duration::from_millis(10),
            active_uploads: AtomicUsize::new(0),
            peak_uploads: AtomicUsize::new(0),
        }
    }

    pub fn with<F: FnOnce(&mut ApiState)>(self, f: F) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl DeployApi for FakeApi {
    async fn get_current_user(&self) -> Result<CurrentUser, CliError> {
        self.record("get_current_user".to_string());
        let state = self.state.lock().unwrap();
        if let Some(status) = state.user_error {
            return Err(http_error(status, "user"));
        }
        state.user.clone().ok_or_else(|| http_error(401, "no user"))
    }

    async fn get_project(&self, login: &str, slug: &str) -> Result<Project, CliError> {
        self.record(format!("get_project @{login}/{slug}"));
        let state = self.state.lock().unwrap();
        state
            .projects
            .iter()
            .find(|p| p.owner.login == login && p.slug == slug)
            .cloned()
            .ok_or_else(|| http_error(404, "project"))
    }

    async fn get_workspace_projects(&self, login: &str) -> Result<Vec<Project>, CliError> {
        self.record(format!("get_workspace_projects @{login}"));
        let state = self.state.lock().unwrap();
        let known = state
            .user
            .as_ref()
            .is_some_and(|u| u.workspaces.iter().any(|w| w.login == login));
        if !known {
            return Err(http_error(404, "workspace"));
        }
        Ok(state
            .projects
            .iter()
            .filter(|p| p.owner.login == login)
            .cloned()
            .collect())
    }

    async fn post_project(&self, request: &CreateProjectRequest) -> Result<Project, CliError> {
        self.record(format!("post_project {}", request.slug));
        let mut state = self.state.lock().unwrap();
        if let Some((status, codes)) = state.create_project_error.clone() {
            return Err(CliError::Api {
                status,
                codes,
                body: "{}".to_string(),
            });
        }
        let login = state
            .user
            .as_ref()
            .and_then(|u| u.workspaces.iter().find(|w| w.id == request.workspace))
            .map(|w| w.login.clone())
            .ok_or_else(|| http_error(404, "workspace"))?;

        state.next_id += 1;
        let mut created = project(&format!("P{}", state.next_id), &login, &request.slug);
        created.title = request.title.clone();
        state.projects.push(created.clone());
        Ok(created)
    }

    async fn post_deploy(&self, project_id: &str, message: Option<&str>) -> Result<String, CliError> {
        self.record(format!("post_deploy {project_id} {}", message.unwrap_or("-")));
        let mut state = self.state.lock().unwrap();
        if !state.projects.iter().any(|p| p.id == project_id) {
            return Err(http_error(404, "project"));
        }
        let id = format!("D{}", state.deploys.len() + 1);
        state.deploys.insert(
            id.clone(),
            DeployInfo {
                id: id.clone(),
                status: DeployStatus::Created,
                url: None,
            },
        );
        Ok(id)
    }

    async fn post_project_build(&self, project_id: &str) -> Result<(), CliError> {
        self.record(format!("post_project_build {project_id}"));
        let mut state = self.state.lock().unwrap();
        let id = format!("D-cloud{}", state.deploys.len() + 1);
        state.deploys.insert(
            id.clone(),
            DeployInfo {
                id: id.clone(),
                status: DeployStatus::Pending,
                url: None,
            },
        );
        state.marked.insert(id.clone());
        let project = state
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| http_error(404, "project"))?;
        project.latest_created_deploy_id = Some(id);
        Ok(())
    }

    async fn post_project_environment(
        &self,
        project_id: &str,
        source: &ProjectSource,
    ) -> Result<(), CliError> {
        self.record(format!("post_project_environment {project_id} {}", source.branch));
        let mut state = self.state.lock().unwrap();
        state.environments.push((project_id.to_string(), source.clone()));
        if let Some(project) = state.projects.iter_mut().find(|p| p.id == project_id) {
            project.source = Some(source.clone());
        }
        Ok(())
    }

    async fn get_deploy(&self, deploy_id: &str) -> Result<DeployInfo, CliError> {
        self.record(format!("get_deploy {deploy_id}"));
        let mut state = self.state.lock().unwrap();
        let processing = state.marked.contains(deploy_id);
        let next = if processing {
            Some(state.processing.pop_front().unwrap_or(DeployStatus::Uploaded))
        } else {
            None
        };
        let deploy = state
            .deploys
            .get_mut(deploy_id)
            .ok_or_else(|| http_error(404, "deploy"))?;
        if let Some(status) = next {
            deploy.status = status;
            if deploy.status == DeployStatus::Uploaded {
                deploy.url = Some(format!("https://acme.siteship.dev/{deploy_id}"));
            }
        }
        Ok(deploy.clone())
    }

    async fn post_deploy_manifest(
        &self,
        deploy_id: &str,
        files: &[ManifestFileInfo],
    ) -> Result<DeployManifestResponse, CliError> {
        self.record(format!("post_deploy_manifest {deploy_id} {}", files.len()));
        let mut state = self.state.lock().unwrap();
        state.manifests.push(files.to_vec());
        if let Some(response) = state.manifest_override.clone() {
            return Ok(response);
        }
        let instructions = files
            .iter()
            .map(|f| UploadInstruction {
                path: f.path.clone(),
                status: if state.stored.get(&f.path) == Some(&f.hash) {
                    UploadStatus::Skip
                } else {
                    UploadStatus::Upload
                },
                detail: None,
            })
            .collect();
        Ok(DeployManifestResponse {
            status: ManifestStatus::Ok,
            detail: None,
            files: instructions,
        })
    }

    async fn post_deploy_file(
        &self,
        deploy_id: &str,
        local_path: &Path,
        client_name: &str,
    ) -> Result<(), CliError> {
        self.record(format!("post_deploy_file {deploy_id} {client_name}"));
        if self.state.lock().unwrap().fail_uploads.contains(client_name) {
            return Err(http_error(500, "upload failed"));
        }

        let now = self.active_uploads.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_uploads.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.upload_delay).await;
        self.active_uploads.fetch_sub(1, Ordering::SeqCst);

        let bytes = tokio::fs::read(local_path).await?;
        self.state
            .lock()
            .unwrap()
            .stored
            .insert(client_name.to_string(), sha512_base64(&bytes));
        Ok(())
    }

    async fn post_deploy_uploaded(
        &self,
        deploy_id: &str,
        build_manifest: Option<&Value>,
    ) -> Result<DeployInfo, CliError> {
        self.record(format!("post_deploy_uploaded {deploy_id}"));
        let mut state = self.state.lock().unwrap();
        state.uploaded_payloads.push(build_manifest.cloned());
        state.marked.insert(deploy_id.to_string());
        let deploy = state
            .deploys
            .get_mut(deploy_id)
            .ok_or_else(|| http_error(404, "deploy"))?;
        deploy.status = DeployStatus::Pending;
        Ok(deploy.clone())
    }

    async fn get_github_repository(
        &self,
        query: &GitHubRepositoryQuery,
    ) -> Result<Option<GitHubRepository>, CliError> {
        self.record(format!("get_github_repository {:?}", query));
        let mut state = self.state.lock().unwrap();
        match query {
            GitHubRepositoryQuery::ByName { owner, repo } => {
                if state.unauthorized_lookups > 0 {
                    state.unauthorized_lookups -= 1;
                    return Ok(None);
                }
                Ok(state
                    .repos
                    .iter()
                    .find(|(o, r, _)| o == owner && r == repo)
                    .map(|(_, _, found)| found.clone()))
            }
            GitHubRepositoryQuery::ByProviderId(id) => Ok(state
                .repos
                .iter()
                .find(|(_, _, found)| &found.provider_id == id)
                .map(|(_, _, found)| found.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// prompts

#[derive(Debug, Clone)]
pub enum Answer {
    Confirm(bool),
    /// Empty input takes the default
    Input(&'static str),
    Select(usize),
    Secret(&'static str),
    Cancel,
}

#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Answer>>,
    pub asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    fn next(&self, message: &str) -> Answer {
        self.asked.lock().unwrap().push(message.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted answer for: {message}"))
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool, CliError> {
        match self.next(message) {
            Answer::Confirm(value) => Ok(value),
            Answer::Cancel => Err(CliError::canceled()),
            other => panic!("expected a confirm answer for {message}, got {other:?}"),
        }
    }

    fn input(
        &self,
        message: &str,
        default: Option<&str>,
        validate: Validator<'_>,
    ) -> Result<String, CliError> {
        match self.next(message) {
            Answer::Input(value) => {
                let value = if value.is_empty() {
                    default.unwrap_or_default().to_string()
                } else {
                    value.to_string()
                };
                if let Err(reason) = validate(&value) {
                    panic!("scripted input {value:?} rejected: {reason}");
                }
                Ok(value)
            }
            Answer::Cancel => Err(CliError::canceled()),
            other => panic!("expected an input answer for {message}, got {other:?}"),
        }
    }

    fn select(&self, message: &str, items: &[String], _default: usize) -> Result<usize, CliError> {
        match self.next(message) {
            Answer::Select(index) => {
                assert!(index < items.len(), "{index} out of range for {items:?}");
                Ok(index)
            }
            Answer::Cancel => Err(CliError::canceled()),
            other => panic!("expected a select answer for {message}, got {other:?}"),
        }
    }

    fn secret(&self, message: &str) -> Result<String, CliError> {
        match self.next(message) {
            Answer::Secret(value) => Ok(value.to_string()),
            Answer::Cancel => Err(CliError::canceled()),
            other => panic!("expected a secret answer for {message}, got {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// telemetry

#[derive(Default)]
pub struct RecordingTelemetry {
    pub events: Mutex<Vec<(String, Option<Value>)>>,
}

impl RecordingTelemetry {
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn data(&self, event: &str) -> Option<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == event)
            .and_then(|(_, data)| data.clone())
    }
}

#[async_trait]
impl TelemetrySink for RecordingTelemetry {
    async fn record(&self, event: &str, data: Option<Value>) -> Result<(), CliError> {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), data));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// effects

pub struct FakeEffects {
    pub api: Arc<FakeApi>,
    pub interactive: bool,
    pub prompt: ScriptedPrompt,
    pub output: Mutex<Vec<String>>,
    pub key: Option<ApiKey>,
    pub logins: AtomicUsize,
    pub builds: AtomicUsize,
    pub config_writes: AtomicUsize,
    pub git_remotes: String,
    pub git_branch: String,
    pub telemetry: RecordingTelemetry,
}

impl FakeEffects {
    pub fn new(api: FakeApi) -> Self {
        Self {
            api: Arc::new(api),
            interactive: false,
            prompt: ScriptedPrompt::default(),
            output: Mutex::new(Vec::new()),
            key: Some(ApiKey::new("test-key", KeySource::Env)),
            logins: AtomicUsize::new(0),
            builds: AtomicUsize::new(0),
            config_writes: AtomicUsize::new(0),
            git_remotes: "origin\tgit@github.com:acme/site.git (fetch)\norigin\tgit@github.com:acme/site.git (push)".to_string(),
            git_branch: "main".to_string(),
            telemetry: RecordingTelemetry::default(),
        }
    }

    pub fn interactive(mut self, answers: Vec<Answer>) -> Self {
        self.interactive = true;
        *self.prompt.answers.lock().unwrap() = answers.into();
        self
    }

    pub fn without_key(mut self) -> Self {
        self.key = None;
        self
    }

    pub fn output(&self) -> String {
        self.output.lock().unwrap().join("\n")
    }

    fn push(&self, kind: &str, message: &str) {
        self.output
            .lock()
            .unwrap()
            .push(format!("[{kind}] {message}"));
    }
}

#[async_trait]
impl DeployEffects for FakeEffects {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn prompt(&self) -> &dyn Prompt {
        &self.prompt
    }

    fn note(&self, message: &str) {
        self.push("note", message);
    }

    fn step(&self, message: &str) {
        self.push("step", message);
    }

    fn warn(&self, message: &str) {
        self.push("warn", message);
    }

    fn progress(&self, message: &str) {
        self.push("progress", message);
    }

    fn ui_url(&self) -> String {
        "https://siteship.test".to_string()
    }

    async fn build(&self, layout: &ProjectLayout) -> Result<(), CliError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        tokio::fs::create_dir_all(&layout.output).await?;
        tokio::fs::write(layout.output.join("index.html"), "<h1>built</h1>").await?;
        Ok(())
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn api_key(&self) -> Option<ApiKey> {
        self.key.clone()
    }

    async fn login(&self) -> Result<ApiKey, CliError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.api.state.lock().unwrap().user_error = None;
        Ok(ApiKey::new("fresh-key", KeySource::Login))
    }

    fn api_client(&self, _key: &ApiKey) -> Result<Arc<dyn DeployApi>, CliError> {
        Ok(self.api.clone())
    }

    async fn read_deploy_config(&self, file: &File) -> Result<DeployConfig, CliError> {
        load_deploy_config(file).await
    }

    async fn write_deploy_config(&self, file: &File, config: &DeployConfig) -> Result<(), CliError> {
        self.config_writes.fetch_add(1, Ordering::SeqCst);
        save_deploy_config(file, config).await
    }

    async fn git(&self, _dir: &Path, args: &[&str]) -> Result<String, CliError> {
        match args {
            ["remote", "-v"] => Ok(self.git_remotes.clone()),
            ["rev-parse", "--abbrev-ref", "HEAD"] => Ok(self.git_branch.clone()),
            other => Err(CliError::new(format!("unexpected git call {other:?}"))),
        }
    }

    fn telemetry(&self) -> &dyn TelemetrySink {
        &self.telemetry
    }
}

// ---------------------------------------------------------------------------
// project on disk

pub struct Site {
    pub dir: TempDir,
    pub layout: ProjectLayout,
}

impl Site {
    /// Source root with one page, no build yet
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path().join("src"), dir.path().join("dist"));
        std::fs::create_dir_all(&layout.root).unwrap();
        std::fs::write(layout.root.join("index.md"), "# Hello").unwrap();
        Self { dir, layout }
    }

    pub fn write_build(&self, files: &[(&str, &str)]) {
        for (name, contents) in files {
            let path = self.layout.output.join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
    }

    pub fn write_config(&self, config: &DeployConfig) {
        let path = self.config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string_pretty(config).unwrap()).unwrap();
    }

    pub fn read_config(&self) -> Option<DeployConfig> {
        let contents = std::fs::read_to_string(self.config_path()).ok()?;
        Some(serde_json::from_str(&contents).unwrap())
    }

    pub fn config_path(&self) -> PathBuf {
        self.layout.deploy_config_file().path().to_path_buf()
    }

    pub fn init_git(&self) {
        std::fs::create_dir_all(self.dir.path().join(".git")).unwrap();
    }

    pub fn options(&self) -> DeployOptions {
        DeployOptions {
            layout: self.layout.clone(),
            working_dir: self.dir.path().to_path_buf(),
            ..Default::default()
        }
        .with_poll_timing(Duration::from_secs(1), Duration::from_secs(300))
    }
}

pub fn config(login: &str, slug: &str, id: &str, continuous: Option<bool>) -> DeployConfig {
    DeployConfig {
        project_id: Some(id.to_string()),
        project_slug: Some(slug.to_string()),
        workspace_login: Some(login.to_string()),
        continuous_deployment: continuous,
    }
}
