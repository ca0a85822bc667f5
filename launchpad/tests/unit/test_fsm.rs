//! FSM unit tests

use launchpad::deploy::fsm::{DeploymentEvent, DeploymentStatus};

#[test]
fn test_fsm_success_flow() {
    let mut status = DeploymentStatus::Cloning;

    status = status.next(&DeploymentEvent::Cloned).unwrap();
    assert_eq!(status, DeploymentStatus::Cloned);

    status = status.next(&DeploymentEvent::Deploy).unwrap();
    assert_eq!(status, DeploymentStatus::Deploying);

    status = status
        .next(&DeploymentEvent::DeploySuccess {
            project_url: "https://app.up.railway.app".to_string(),
        })
        .unwrap();
    assert_eq!(status, DeploymentStatus::Completed);
    assert!(status.is_terminal());
}

#[test]
fn test_fsm_failure_flow() {
    let status = DeploymentStatus::Deploying
        .next(&DeploymentEvent::DeployFailed("boom".to_string()))
        .unwrap();
    assert_eq!(status, DeploymentStatus::Failed);
    assert!(status.is_terminal());
}

#[test]
fn test_fsm_rejects_skipping_states() {
    assert!(DeploymentStatus::Cloning.next(&DeploymentEvent::Deploy).is_err());
    assert!(DeploymentStatus::Cloned
        .next(&DeploymentEvent::DeployFailed("boom".to_string()))
        .is_err());
}

#[test]
fn test_fsm_terminal_states_are_final() {
    for status in [DeploymentStatus::Completed, DeploymentStatus::Failed] {
        assert!(status.next(&DeploymentEvent::Deploy).is_err());
        assert!(status.next(&DeploymentEvent::Cloned).is_err());
    }
}

#[test]
fn test_fsm_status_serializes_lowercase() {
    let json = serde_json::to_string(&DeploymentStatus::Deploying).unwrap();
    assert_eq!(json, "\"deploying\"");
    assert_eq!(DeploymentStatus::Cloned.to_string(), "cloned");
}
