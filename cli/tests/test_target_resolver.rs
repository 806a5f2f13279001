//! Deploy target resolution and deploy config reconciliation

mod common;

use std::sync::atomic::Ordering;

use common::{config, project, user, workspace, Answer, FakeApi, FakeEffects, Site};
use siteship::authn::session::authenticate;
use siteship::deploy::target::{DeployTargetInfo, TargetResolver};
use siteship::errors::CliError;
use siteship::storage::deploy_config::DeployConfig;
use siteship_api_types::{AccessLevel, TOO_MANY_PROJECTS};

#[tokio::test]
async fn test_new_app_resolves_to_create_then_existing() {
    let site = Site::new();
    let api = FakeApi::new(user(vec![workspace("acme", "owner")]));
    let effects = FakeEffects::new(api).interactive(vec![
        Answer::Confirm(true),    // no apps found, create one
        Answer::Input(""),        // slug defaults to the slugified title
        Answer::Select(1),        // public
        Answer::Confirm(true),    // continuous deployment
    ]);
    let mut options = site.options();
    options.title = Some("My App".to_string());
    let session = authenticate(&effects).await.unwrap();
    let resolver = TargetResolver::new(&effects, &session, &options);

    let (target, config) = resolver.resolve(DeployConfig::default()).await.unwrap();
    let DeployTargetInfo::Create(new) = &target else {
        panic!("expected a new project, got {target:?}");
    };
    assert_eq!(new.project_slug, "my-app");
    assert_eq!(new.title, "My App");
    assert_eq!(new.workspace.login, "acme");
    assert_eq!(new.access_level, AccessLevel::Public);
    assert_eq!(config.continuous_deployment, Some(true));
    assert!(!effects.api.called("post_project"));

    let existing = resolver.ensure_project(target).await.unwrap();
    assert_eq!(existing.project.id, "P1");
    assert_eq!(existing.project.slug, "my-app");
    assert_eq!(existing.workspace.login, "acme");
}

#[tokio::test]
async fn test_persisted_target_needs_no_prompts() {
    let site = Site::new();
    site.write_config(&config("@acme", "site", "P7", Some(false)));
    let api = FakeApi::new(user(vec![workspace("acme", "owner")])).with(|s| {
        s.projects.push(project("P7", "acme", "site"));
    });
    let effects = FakeEffects::new(api);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let (target, saved) = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap();

    assert_eq!(target.project.id, "P7");
    assert!(effects.api.called("get_project @acme/site"));
    assert_eq!(saved, config("acme", "site", "P7", Some(false)));
    assert_eq!(site.read_config(), Some(saved));
    assert_eq!(effects.config_writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_backfills_legacy_project_id() {
    let site = Site::new();
    site.write_config(&DeployConfig {
        project_id: Some("P9".to_string()),
        continuous_deployment: Some(false),
        ..Default::default()
    });
    let api = FakeApi::new(user(vec![workspace("first", "owner"), workspace("second", "member")]))
        .with(|s| {
            s.projects.push(project("P1", "first", "blog"));
            s.projects.push(project("P9", "second", "docs"));
        });
    let effects = FakeEffects::new(api);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let (target, saved) = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap();

    assert_eq!(target.project.id, "P9");
    assert_eq!(saved, config("second", "docs", "P9", Some(false)));
}

#[tokio::test]
async fn test_unmatched_project_id_is_not_fatal() {
    let site = Site::new();
    site.write_config(&DeployConfig {
        project_id: Some("P404".to_string()),
        ..Default::default()
    });
    let api = FakeApi::new(user(vec![workspace("acme", "owner")]));
    let effects = FakeEffects::new(api);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let err = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap_err();

    // search found nothing, so the prompt path is reached
    assert!(matches!(err, CliError::NonInteractive(_)), "{err}");
}

#[tokio::test]
async fn test_missing_project_falls_through_to_prompt() {
    let site = Site::new();
    site.write_config(&config("acme", "gone", "P3", Some(false)));
    let api = FakeApi::new(user(vec![workspace("acme", "owner")])).with(|s| {
        s.projects.push(project("P5", "acme", "other"));
    });
    let effects = FakeEffects::new(api).interactive(vec![
        Answer::Select(1),        // pick the existing app
        Answer::Confirm(true),    // project id drifted, update config
    ]);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let (target, saved) = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap();

    assert_eq!(target.project.id, "P5");
    assert_eq!(saved, config("acme", "other", "P5", Some(false)));
    assert!(effects.output().contains("The project id P3"));
}

#[tokio::test]
async fn test_drift_is_fatal_non_interactive() {
    let site = Site::new();
    site.write_config(&config("acme", "site", "P-old", Some(false)));
    let api = FakeApi::new(user(vec![workspace("acme", "owner")])).with(|s| {
        s.projects.push(project("P-new", "acme", "site"));
    });
    let effects = FakeEffects::new(api);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let err = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Cancelling deploy due to misconfiguration.");
    assert_eq!(effects.config_writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_declined_drift_cancels() {
    let site = Site::new();
    site.write_config(&config("acme", "site", "P-old", Some(false)));
    let api = FakeApi::new(user(vec![workspace("acme", "owner")])).with(|s| {
        s.projects.push(project("P-new", "acme", "site"));
    });
    let effects = FakeEffects::new(api).interactive(vec![Answer::Confirm(false)]);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let err = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap_err();

    assert!(err.is_canceled());
    assert_eq!(err.exit_code(), 0);
}

#[tokio::test]
async fn test_invalid_persisted_slug_is_fatal() {
    let site = Site::new();
    site.write_config(&config("acme", "Not A Slug", "P1", Some(false)));
    let effects = FakeEffects::new(FakeApi::new(user(vec![workspace("acme", "owner")])));
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let err = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap_err();

    assert!(matches!(err, CliError::Config(_)), "{err}");
    assert!(!effects.api.called("get_project"));
}

#[tokio::test]
async fn test_workspace_choice_is_sorted_by_role_then_name() {
    let site = Site::new();
    let api = FakeApi::new(user(vec![
        workspace("zeta", "member"),
        workspace("beta", "owner"),
        workspace("alpha", "member"),
    ]))
    .with(|s| {
        s.projects.push(project("P1", "alpha", "docs"));
    });
    // owner first, then members by name: beta, alpha, zeta
    let effects = FakeEffects::new(api).interactive(vec![
        Answer::Select(1),        // alpha
        Answer::Select(1),        // docs
        Answer::Confirm(false),   // local builds
    ]);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let (target, _) = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap();
    assert_eq!(target.project.id, "P1");
    assert!(effects.api.called("get_workspace_projects @alpha"));
}

#[tokio::test]
async fn test_canceled_prompt_is_silent() {
    let site = Site::new();
    let api = FakeApi::new(user(vec![workspace("acme", "owner")])).with(|s| {
        s.projects.push(project("P1", "acme", "docs"));
    });
    let effects = FakeEffects::new(api).interactive(vec![Answer::Cancel]);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let err = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap_err();

    assert!(err.is_canceled());
    assert!(!err.should_print());
}

#[tokio::test]
async fn test_declining_first_app_cancels() {
    let site = Site::new();
    let effects = FakeEffects::new(FakeApi::new(user(vec![workspace("acme", "owner")])))
        .interactive(vec![Answer::Confirm(false)]);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let err = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap_err();
    assert!(err.is_canceled());
}

#[tokio::test]
async fn test_no_workspaces() {
    let site = Site::new();
    let effects = FakeEffects::new(FakeApi::new(user(vec![workspace("acme", "viewer")])))
        .interactive(vec![]);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();
    assert!(session.user.workspaces.is_empty());

    let err = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("don't have any workspaces"));
}

#[tokio::test]
async fn test_project_limit_prints_upgrade_hint() {
    let site = Site::new();
    let api = FakeApi::new(user(vec![workspace("acme", "owner")])).with(|s| {
        s.create_project_error = Some((403, vec![TOO_MANY_PROJECTS.to_string()]));
    });
    let effects = FakeEffects::new(api).interactive(vec![
        Answer::Confirm(true),
        Answer::Input("My App"),
        Answer::Input("my-app"),
        Answer::Select(0),
        Answer::Confirm(false),
    ]);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let err = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap_err();

    assert!(!err.should_print());
    assert_eq!(err.exit_code(), 1);
    let output = effects.output();
    assert!(output.contains("reached its app limit"), "{output}");
    assert!(output.contains("https://siteship.test/team/@acme/settings"), "{output}");
    assert_eq!(effects.config_writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_other_creation_failure() {
    let site = Site::new();
    let api = FakeApi::new(user(vec![workspace("acme", "owner")])).with(|s| {
        s.create_project_error = Some((409, vec!["SLUG_TAKEN".to_string()]));
    });
    let effects = FakeEffects::new(api).interactive(vec![
        Answer::Confirm(true),
        Answer::Input("My App"),
        Answer::Input(""),
        Answer::Select(0),
        Answer::Confirm(false),
    ]);
    let options = site.options();
    let session = authenticate(&effects).await.unwrap();

    let err = TargetResolver::new(&effects, &session, &options)
        .resolve_and_persist()
        .await
        .unwrap_err();

    assert!(!err.should_print());
    assert!(effects.output().contains("Could not create app"));
}
