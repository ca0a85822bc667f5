//! Repository fetching against a real `git` binary and a local repository

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use launchpad::deploy::fsm::DeploymentStatus;
use launchpad::deploy::git::GitCli;
use launchpad::deploy::service::DeploymentService;
use launchpad::errors::LaunchpadError;
use tempfile::TempDir;
use tokio_test::assert_ok;

use crate::common::{deployment_options, FakePlatform};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(["-c", "user.name=Launchpad", "-c", "user.email=launchpad@localhost"])
        .args(["-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Repository with a `main` branch tracking README.md and a `feature` branch
fn upstream_repository(dir: &TempDir) -> String {
    let upstream = dir.path().join("upstream");
    std::fs::create_dir_all(&upstream).unwrap();

    git(&upstream, &["init", "--quiet"]);
    std::fs::write(upstream.join("README.md"), "# app\n").unwrap();
    git(&upstream, &["add", "README.md"]);
    git(&upstream, &["commit", "--quiet", "-m", "initial"]);
    git(&upstream, &["branch", "-M", "main"]);

    git(&upstream, &["checkout", "--quiet", "-b", "feature"]);
    std::fs::write(upstream.join("FEATURE.md"), "feature\n").unwrap();
    git(&upstream, &["add", "FEATURE.md"]);
    git(&upstream, &["commit", "--quiet", "-m", "feature"]);
    git(&upstream, &["checkout", "--quiet", "main"]);

    format!("file://{}", upstream.display())
}

async fn git_service(dir: &TempDir) -> (DeploymentService, std::path::PathBuf) {
    let options = deployment_options(dir, 3);
    let service = DeploymentService::new(
        &options,
        Arc::new(GitCli::new("git")),
        Arc::new(FakePlatform::default()),
    );
    service.init().await.unwrap();
    (service, options.workspace_root)
}

fn assert_no_trace(service: &DeploymentService, workspace_root: &Path) {
    assert!(service.list_all().is_empty());
    assert_eq!(std::fs::read_dir(workspace_root).unwrap().count(), 0);
}

#[tokio::test]
async fn test_git_clones_requested_branch() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo_url = upstream_repository(&dir);
    let (service, workspace_root) = git_service(&dir).await;

    let id = assert_ok!(service.admit_and_clone(&repo_url, "feature").await);

    let record = service.get_status(&id).unwrap();
    assert_eq!(record.status, DeploymentStatus::Cloned);
    assert!(workspace_root.join(&id).join("FEATURE.md").exists());

    let id = assert_ok!(service.admit_and_clone(&repo_url, "main").await);
    assert!(workspace_root.join(&id).join("README.md").exists());
    assert!(!workspace_root.join(&id).join("FEATURE.md").exists());
}

#[tokio::test]
async fn test_git_unreachable_repository_is_clone_failure() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo_url = format!("file://{}", dir.path().join("does-not-exist").display());
    let (service, workspace_root) = git_service(&dir).await;

    let result = service.admit_and_clone(&repo_url, "main").await;

    assert!(matches!(result, Err(LaunchpadError::CloneFailed(_))), "{result:?}");
    assert_no_trace(&service, &workspace_root);
}

#[tokio::test]
async fn test_git_missing_branch_is_checkout_failure() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo_url = upstream_repository(&dir);
    let (service, workspace_root) = git_service(&dir).await;

    let result = service.admit_and_clone(&repo_url, "no-such-branch").await;

    assert!(matches!(result, Err(LaunchpadError::CheckoutFailed(_))), "{result:?}");
    assert_no_trace(&service, &workspace_root);
}

#[tokio::test]
async fn test_git_branch_named_like_tracked_file_is_checkout_failure() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo_url = upstream_repository(&dir);
    let (service, workspace_root) = git_service(&dir).await;

    // README.md is a tracked path, not a ref
    let result = service.admit_and_clone(&repo_url, "README.md").await;

    assert!(matches!(result, Err(LaunchpadError::CheckoutFailed(_))), "{result:?}");
    assert_no_trace(&service, &workspace_root);
}
