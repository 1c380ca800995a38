use beacon::config::WorkspaceConfig;
use beacon::consts::DEFAULT_SERVICE_NAME;
use beacon::control::mock::MockControlPlane;
use beacon::toggle;
use beacon::{Error, ErrorKind};

fn workspace() -> WorkspaceConfig {
    WorkspaceConfig {
        subscription_id: "00000000-1111-2222-3333-444444444444".to_string(),
        resource_group: "ml-rg".to_string(),
        workspace_name: "bank-ws".to_string(),
    }
}

#[tokio::test]
async fn enables_monitoring_and_confirms() {
    let plane = MockControlPlane::new().with_service(DEFAULT_SERVICE_NAME, false);

    let confirmation = toggle::run(&plane, &workspace(), DEFAULT_SERVICE_NAME)
        .await
        .unwrap();

    assert_eq!(
        confirmation.to_string(),
        "✅ Application Insights enabled for bank-marketing-predictor."
    );
    assert_eq!(plane.app_insights_enabled(DEFAULT_SERVICE_NAME), Some(true));
    assert_eq!(plane.update_calls(), 1);
}

#[tokio::test]
async fn toggling_twice_matches_toggling_once() {
    let once = MockControlPlane::new().with_service(DEFAULT_SERVICE_NAME, false);
    toggle::run(&once, &workspace(), DEFAULT_SERVICE_NAME)
        .await
        .unwrap();

    let twice = MockControlPlane::new().with_service(DEFAULT_SERVICE_NAME, false);
    let first = toggle::run(&twice, &workspace(), DEFAULT_SERVICE_NAME)
        .await
        .unwrap();
    let second = toggle::run(&twice, &workspace(), DEFAULT_SERVICE_NAME)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        once.app_insights_enabled(DEFAULT_SERVICE_NAME),
        twice.app_insights_enabled(DEFAULT_SERVICE_NAME)
    );
    assert_eq!(twice.app_insights_enabled(DEFAULT_SERVICE_NAME), Some(true));
}

#[tokio::test]
async fn already_enabled_still_sends_update() {
    let plane = MockControlPlane::new().with_service(DEFAULT_SERVICE_NAME, true);

    toggle::run(&plane, &workspace(), DEFAULT_SERVICE_NAME)
        .await
        .unwrap();

    assert_eq!(plane.update_calls(), 1);
    assert_eq!(plane.app_insights_enabled(DEFAULT_SERVICE_NAME), Some(true));
}

#[tokio::test]
async fn unknown_service_fails_without_mutation() {
    let plane = MockControlPlane::new().with_service(DEFAULT_SERVICE_NAME, false);

    let err = toggle::run(&plane, &workspace(), "no-such-service")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ServiceNotFound(ref name) if name == "no-such-service"));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(plane.update_calls(), 0);
    assert_eq!(plane.app_insights_enabled(DEFAULT_SERVICE_NAME), Some(false));
}

#[tokio::test]
async fn rejected_update_leaves_flag_unchanged() {
    let plane = MockControlPlane::new()
        .with_service(DEFAULT_SERVICE_NAME, false)
        .rejecting(401, "InvalidAuthenticationToken");

    let err = toggle::run(&plane, &workspace(), DEFAULT_SERVICE_NAME)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Rejected { status: 401, .. }));
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(plane.update_calls(), 1);
    assert_eq!(plane.app_insights_enabled(DEFAULT_SERVICE_NAME), Some(false));
}

#[tokio::test]
async fn discovered_config_drives_toggle() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"subscription_id": "sub", "resource_group": "rg", "workspace_name": "ws"}"#,
    )
    .unwrap();
    let plane = MockControlPlane::new().with_service(DEFAULT_SERVICE_NAME, false);

    let ws = WorkspaceConfig::discover(dir.path()).unwrap();
    let confirmation = toggle::run(&plane, &ws, DEFAULT_SERVICE_NAME)
        .await
        .unwrap();

    assert_eq!(confirmation.service, DEFAULT_SERVICE_NAME);
    assert_eq!(plane.app_insights_enabled(DEFAULT_SERVICE_NAME), Some(true));
}
