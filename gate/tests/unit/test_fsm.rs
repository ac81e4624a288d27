//! Deployment status graph tests

use stagegate::deploy::fsm::{check_transition, DeploymentStatus};
use stagegate::errors::{ErrorKind, GateError};

use DeploymentStatus::*;

#[test]
fn test_allowed_edges() {
    let allowed = [
        (Pending, Deployed),
        (Pending, Rejected),
        (Pending, Failed),
        (Deployed, RolledBack),
    ];

    for from in DeploymentStatus::ALL {
        for to in DeploymentStatus::ALL {
            let expected = allowed.contains(&(from, to));
            assert_eq!(
                check_transition(from, to).is_ok(),
                expected,
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn test_terminal_states() {
    assert!(!Pending.is_terminal());
    assert!(!Deployed.is_terminal());
    assert!(Rejected.is_terminal());
    assert!(RolledBack.is_terminal());
    assert!(Failed.is_terminal());
}

#[test]
fn test_refusal_names_both_states() {
    let err = check_transition(Pending, RolledBack).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(
        err.to_string(),
        "Invalid status transition: pending -> rolled_back"
    );
    assert!(matches!(
        err,
        GateError::State {
            current: Pending,
            requested: RolledBack
        }
    ));
}

#[test]
fn test_status_strings() {
    for status in DeploymentStatus::ALL {
        assert_eq!(status.as_str().parse::<DeploymentStatus>().unwrap(), status);
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            format!("\"{}\"", status.as_str())
        );
    }
    assert!("approved".parse::<DeploymentStatus>().is_err());
}
