//! Stack detection tests against on-disk workspaces

use std::path::Path;

use deployify::deploy::detector::StackDetector;
use deployify::models::stack::{DetectedStack, PackageManager, ProjectType};
use tempfile::TempDir;

async fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, body) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(path, body).await.unwrap();
    }
    dir
}

#[tokio::test]
async fn test_plain_index_html() {
    let dir = workspace(&[("index.html", "<h1>hi</h1>")]).await;
    let stack = StackDetector::new().analyze(dir.path()).await;

    assert_eq!(stack.project_type, ProjectType::Static);
    assert_eq!(stack.framework, "Static HTML");
    assert_eq!(stack.build_cmd, None);
    assert!(!stack.has_dockerfile);
}

#[tokio::test]
async fn test_next_app_with_pnpm() {
    let dir = workspace(&[
        (
            "package.json",
            r#"{"dependencies":{"next":"14.1.0","react":"18.2.0"},"engines":{"node":">=18"}}"#,
        ),
        ("pnpm-lock.yaml", ""),
        ("Dockerfile", "FROM node:20"),
    ])
    .await;
    let stack = StackDetector::new().analyze(dir.path()).await;

    assert_eq!(stack.project_type, ProjectType::Ssr);
    assert_eq!(stack.framework, "Next.js");
    assert_eq!(stack.package_manager, PackageManager::Pnpm);
    assert_eq!(stack.node_version.as_deref(), Some(">=18"));
    assert!(stack.has_dockerfile);
    assert_eq!(stack.dependencies.get("next").map(String::as_str), Some("14.1.0"));
}

#[tokio::test]
async fn test_react_spa_with_yarn() {
    let dir = workspace(&[
        (
            "package.json",
            r#"{"scripts":{"build":"react-scripts build"},"dependencies":{"react":"18.2.0","react-dom":"18.2.0"}}"#,
        ),
        ("yarn.lock", ""),
        ("src/index.js", ""),
    ])
    .await;
    let stack = StackDetector::new().analyze(dir.path()).await;

    assert_eq!(stack.project_type, ProjectType::Spa);
    assert_eq!(stack.framework, "React");
    assert_eq!(stack.package_manager, PackageManager::Yarn);
    assert_eq!(stack.dist_dir.as_deref(), Some("build"));
}

#[tokio::test]
async fn test_flask_requirements() {
    let dir = workspace(&[
        ("requirements.txt", "flask==3.0.0\n"),
        ("app.py", "from flask import Flask"),
    ])
    .await;
    let stack = StackDetector::new().analyze(dir.path()).await;

    assert_eq!(stack.framework, "Flask");
    assert!(stack.project_type.is_server_side());
}

#[tokio::test]
async fn test_bare_dockerfile_is_a_container() {
    let dir = workspace(&[("Dockerfile", "FROM alpine"), ("run.sh", "")]).await;
    let stack = StackDetector::new().analyze(dir.path()).await;

    assert_eq!(stack.project_type, ProjectType::Container);
    assert!(stack.has_dockerfile);
}

#[tokio::test]
async fn test_hidden_files_are_ignored() {
    let dir = workspace(&[(".env", "SECRET=1"), (".github/workflows/ci.yml", "")]).await;
    let stack = StackDetector::new().analyze(dir.path()).await;

    assert_eq!(stack, DetectedStack::fallback());
}

#[tokio::test]
async fn test_analyze_is_deterministic() {
    let dir = workspace(&[
        ("package.json", r#"{"dependencies":{"vue":"3.4.0","vite":"5.0.0"}}"#),
        ("index.html", ""),
    ])
    .await;
    let detector = StackDetector::new();

    let first = detector.analyze(dir.path()).await;
    let second = detector.analyze(dir.path()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_workspace_falls_back() {
    let stack = StackDetector::new()
        .analyze(Path::new("/nonexistent/deployify/workspace"))
        .await;

    assert_eq!(stack.project_type, ProjectType::Static);
    assert_eq!(stack.framework, "unknown");
    assert_eq!(stack.package_manager, PackageManager::Npm);
    assert!(!stack.has_dockerfile);
}

#[tokio::test]
async fn test_broken_manifest_does_not_abort_analysis() {
    let dir = workspace(&[("package.json", "{ definitely not json"), ("index.html", "")]).await;
    let stack = StackDetector::new().analyze(dir.path()).await;

    assert_eq!(stack.framework, "Static HTML");
}
