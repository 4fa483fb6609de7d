//! End-to-end job tests with scripted clone and build stages

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{CancellingCloner, CountingBuilder, FailingBuilder, FakeCloner};
use deployify::deploy::fsm::DeploymentStatus;
use deployify::deploy::git::{GitCloner, RepoCloner};
use deployify::deploy::gateway::ProviderGateway;
use deployify::deploy::orchestrator::{record_duration, Orchestrator};
use deployify::deploy::providers::{LocalConfig, LocalProvider, NetlifyConfig, NetlifyProvider};
use deployify::deploy::registry::LOCAL;
use deployify::filesys::dir::Dir;
use deployify::models::deployment::{Budget, DeploymentRequest, Environment, RecordUpdate};
use deployify::models::stack::ProjectType;
use deployify::store::{DeploymentStore, MemoryStore};
use tempfile::TempDir;

const REACT_MANIFEST: &str =
    r#"{"scripts":{"build":"react-scripts build"},"dependencies":{"react":"18.2.0"}}"#;

struct Harness {
    root: TempDir,
    store: Arc<dyn DeploymentStore>,
    gateway: Arc<ProviderGateway>,
}

impl Harness {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let local = Arc::new(LocalProvider::new(LocalConfig {
            static_dir: root.path().join("static-hosting"),
            base_url: "http://localhost:8080/static".to_string(),
        }));
        let gateway = ProviderGateway::new(local)
            .with_provider(Arc::new(NetlifyProvider::new(NetlifyConfig::default())));
        Self {
            root,
            store: Arc::new(MemoryStore::new()),
            gateway: Arc::new(gateway),
        }
    }

    fn static_dir(&self) -> std::path::PathBuf {
        self.root.path().join("static-hosting")
    }

    fn orchestrator(&self, cloner: Arc<dyn RepoCloner>) -> Orchestrator {
        Orchestrator::new(
            self.store.clone(),
            self.gateway.clone(),
            Dir::new(self.root.path().join("workspaces")),
        )
        .with_cloner(cloner)
    }

    async fn queue(&self, repo_url: &str, environment: Environment, budget: Budget) -> String {
        self.store
            .create(&DeploymentRequest::new(repo_url, environment, budget))
            .await
            .unwrap()
    }
}

fn assert_workspaces_removed(cloner: &FakeCloner) {
    for workspace in cloner.workspaces() {
        assert!(!Path::new(&workspace).exists(), "{} left behind", workspace.display());
    }
}

#[tokio::test]
async fn test_static_site_deploys_locally() {
    let harness = Harness::new();
    let cloner = FakeCloner::with_files(&[("index.html", "<h1>hello</h1>")]);
    let id = harness
        .queue("https://github.com/x/static-site", Environment::School, Budget::Free)
        .await;

    let record = harness.orchestrator(cloner.clone()).run_job(&id).await.unwrap();

    assert_eq!(record.status, DeploymentStatus::Success);
    assert_eq!(record.detected_stack.as_ref().unwrap().project_type, ProjectType::Static);
    assert_eq!(record.provider.as_deref(), Some(LOCAL));
    assert!(!record.deployment_url.clone().unwrap_or_default().is_empty());
    assert!(record.started_at.is_some());
    assert!(record.completed_at.is_some());
    assert!(record_duration(&record).is_some());

    let messages: Vec<&str> = record.logs.iter().map(|l| l.message.as_str()).collect();
    assert_eq!(messages[0], "Starting deployment process...");
    assert!(messages.iter().any(|m| m.starts_with("Detected Static HTML (static)")));
    assert!(messages
        .iter()
        .any(|m| m.starts_with("Deployment successful! Available at: http://localhost:8080/static/deploy-")));

    assert_eq!(cloner.clones(), 1);
    assert_eq!(cloner.cleanups(), 1);
    assert_workspaces_removed(&cloner);
}

#[tokio::test]
async fn test_build_failure_fails_and_cleans_up() {
    let harness = Harness::new();
    let cloner = FakeCloner::with_files(&[("package.json", REACT_MANIFEST), ("src/index.js", "")]);
    let id = harness
        .queue("https://github.com/x/react-app", Environment::School, Budget::Free)
        .await;

    let record = harness
        .orchestrator(cloner.clone())
        .with_builder(Arc::new(FailingBuilder))
        .run_job(&id)
        .await
        .unwrap();

    assert_eq!(record.status, DeploymentStatus::Failed);
    let error = record.error_message.clone().unwrap();
    assert!(error.contains("Build failed"), "{error}");
    assert!(record.deployment_url.is_none());
    assert!(record.completed_at.is_some());
    assert!(record
        .logs
        .last()
        .unwrap()
        .message
        .starts_with("Deployment failed: Build failed"));

    assert_eq!(cloner.cleanups(), 1);
    assert_workspaces_removed(&cloner);
}

#[tokio::test]
async fn test_clone_failure_fails_and_cleans_up() {
    let harness = Harness::new();
    let cloner = FakeCloner::failing("repository 'https://github.com/x/missing' not found");
    let id = harness
        .queue("https://github.com/x/missing", Environment::School, Budget::Free)
        .await;

    let record = harness.orchestrator(cloner.clone()).run_job(&id).await.unwrap();

    assert_eq!(record.status, DeploymentStatus::Failed);
    assert!(record.error_message.unwrap().contains("Clone failed"));
    assert!(record.detected_stack.is_none());
    assert_eq!(cloner.cleanups(), 1);
    assert_workspaces_removed(&cloner);
}

#[tokio::test]
async fn test_no_eligible_provider_fails() {
    let harness = Harness::new();
    let cloner = FakeCloner::with_files(&[("requirements.txt", "django==5.0"), ("manage.py", "")]);
    let id = harness
        .queue("https://github.com/x/api", Environment::Prod, Budget::Free)
        .await;

    let record = harness.orchestrator(cloner.clone()).run_job(&id).await.unwrap();

    assert_eq!(record.status, DeploymentStatus::Failed);
    assert!(record.error_message.unwrap().starts_with("No eligible provider"));
    assert_eq!(record.detected_stack.unwrap().framework, "Django");
    assert_eq!(cloner.cleanups(), 1);
}

#[tokio::test]
async fn test_preferred_provider_falls_back_to_local() {
    let harness = Harness::new();
    let cloner = FakeCloner::with_files(&[("index.html", "<h1>hello</h1>")]);
    let mut request = DeploymentRequest::new("https://github.com/x/site", Environment::School, Budget::Free);
    request.prefer_providers = vec!["netlify".to_string()];
    let id = harness.store.create(&request).await.unwrap();

    let record = harness.orchestrator(cloner.clone()).run_job(&id).await.unwrap();

    assert_eq!(record.status, DeploymentStatus::Success);
    // netlify has no token, so the record names the provider that served it
    assert_eq!(record.provider.as_deref(), Some(LOCAL));
    assert!(record
        .logs
        .iter()
        .any(|l| l.message == "Deployed with fallback provider local"));
}

#[tokio::test]
async fn test_terminal_record_is_skipped() {
    let harness = Harness::new();
    let cloner = FakeCloner::with_files(&[("index.html", "")]);
    let id = harness
        .queue("https://github.com/x/site", Environment::School, Budget::Free)
        .await;
    harness.store.cancel(&id).await.unwrap();

    let record = harness.orchestrator(cloner.clone()).run_job(&id).await.unwrap();

    assert_eq!(record.status, DeploymentStatus::Cancelled);
    assert_eq!(cloner.clones(), 0);
}

#[tokio::test]
async fn test_interrupted_record_is_failed() {
    let harness = Harness::new();
    let cloner = FakeCloner::with_files(&[("index.html", "")]);
    let id = harness
        .queue("https://github.com/x/site", Environment::School, Budget::Free)
        .await;
    harness
        .store
        .update_status(&id, DeploymentStatus::Cloning, RecordUpdate::default())
        .await
        .unwrap();

    let record = harness.orchestrator(cloner.clone()).run_job(&id).await.unwrap();

    assert_eq!(record.status, DeploymentStatus::Failed);
    assert!(record.error_message.unwrap().contains("interrupted"));
    assert_eq!(cloner.clones(), 0);
    assert_eq!(cloner.cleanups(), 1);
}

#[tokio::test]
async fn test_unknown_deployment() {
    let harness = Harness::new();
    let result = harness
        .orchestrator(FakeCloner::with_files(&[]))
        .run_job("does-not-exist")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cancel_during_clone_stops_pipeline() {
    let harness = Harness::new();
    let id = harness
        .queue("https://github.com/x/site", Environment::School, Budget::Free)
        .await;
    let cloner = CancellingCloner::new(harness.store.clone(), &id);
    let builder = Arc::new(CountingBuilder::default());

    let record = harness
        .orchestrator(cloner.clone())
        .with_builder(builder.clone())
        .run_job(&id)
        .await
        .unwrap();

    assert_eq!(record.status, DeploymentStatus::Cancelled);
    assert!(record.error_message.is_none());
    assert!(record.deployment_url.is_none());
    assert!(record.detected_stack.is_none());
    assert_eq!(builder.calls(), 0);
    assert!(!harness.static_dir().exists());
    assert_eq!(record.logs.last().unwrap().message, "Deployment cancelled");
    assert_eq!(cloner.cleanups(), 1);
}

#[tokio::test]
async fn test_failure_after_cancel_keeps_cancelled_record() {
    let harness = Harness::new();
    let id = harness
        .queue("https://github.com/x/site", Environment::School, Budget::Free)
        .await;
    let cloner = CancellingCloner::failing(harness.store.clone(), &id, "connection reset");

    let record = harness.orchestrator(cloner.clone()).run_job(&id).await.unwrap();

    assert_eq!(record.status, DeploymentStatus::Cancelled);
    assert!(record.error_message.is_none());
    assert!(!record
        .logs
        .iter()
        .any(|l| l.message.starts_with("Deployment failed")));
    assert_eq!(cloner.cleanups(), 1);
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(["-c", "user.name=deployify", "-c", "user.email=ci@deployify.local"])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

#[tokio::test]
async fn test_git_metadata_is_not_published() {
    let harness = Harness::new();
    let repo = harness.root.path().join("origin");
    std::fs::create_dir_all(&repo).unwrap();
    std::fs::write(repo.join("index.html"), "<h1>hello</h1>").unwrap();
    git(&repo, &["init", "-q"]);
    git(&repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(&repo, &["add", "index.html"]);
    git(&repo, &["commit", "-q", "-m", "initial"]);

    let mut request = DeploymentRequest::new(
        format!("file://{}", repo.display()),
        Environment::School,
        Budget::Free,
    );
    request.branch = "main".to_string();
    let id = harness.store.create(&request).await.unwrap();

    let record = harness
        .orchestrator(Arc::new(GitCloner::default()))
        .run_job(&id)
        .await
        .unwrap();

    assert_eq!(record.status, DeploymentStatus::Success, "{:?}", record.error_message);
    let sites: Vec<_> = std::fs::read_dir(harness.static_dir())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(sites.len(), 1);
    assert!(sites[0].join("index.html").exists());
    assert!(!sites[0].join(".git").exists());
}
