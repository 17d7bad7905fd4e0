mod common;

use chrono::NaiveDate;
use healthgate::access::{GateDecision, Route, RouteGate};
use healthgate::api::{AccessLogsApi, AuthApi, ConsentsApi, FacilitiesApi, NewAccount};
use healthgate::error::ApiError;
use healthgate::models::credentials::ACCESS_TOKEN_KEY;
use healthgate::models::{ConsentType, NewConsent, Role, ScopeKind};
use mockito::{Matcher, Server};
use serde_json::json;

use common::{harness, remaining_keys, seed, stored, PATIENT_USER, WORKER_USER};

fn login_body() -> serde_json::Value {
    json!({
        "access_token": "A1",
        "refresh_token": "R1",
        "user": serde_json::from_str::<serde_json::Value>(PATIENT_USER).unwrap()
    })
}

#[tokio::test]
async fn test_login_with_remember_uses_durable_scope() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("POST", "/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"email": "amina@example.org", "password": "pw"})))
        .with_status(200)
        .with_body(login_body().to_string())
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server.url());
    // Leftovers from an earlier session must not be sent along with the login.
    seed(&h.credentials, ScopeKind::Session, "OLD", "OLDR", WORKER_USER).await;
    let auth = AuthApi::new(h.client.clone());

    let user = auth.login("amina@example.org", "pw", true).await.unwrap();
    m.assert_async().await;
    assert_eq!(user.role, Role::Patient);
    assert_eq!(
        stored(&h.credentials, ScopeKind::Durable, ACCESS_TOKEN_KEY).await.as_deref(),
        Some("A1")
    );
    assert_eq!(stored(&h.credentials, ScopeKind::Session, ACCESS_TOKEN_KEY).await, None);
    assert_eq!(auth.current_user().await.unwrap(), Some(user));
}

#[tokio::test]
async fn test_login_without_remember_uses_session_scope() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(json!({"success": true, "data": login_body()}).to_string())
        .create_async()
        .await;

    let h = harness(&server.url());
    AuthApi::new(h.client.clone())
        .login("amina@example.org", "pw", false)
        .await
        .unwrap();

    assert_eq!(
        stored(&h.credentials, ScopeKind::Session, ACCESS_TOKEN_KEY).await.as_deref(),
        Some("A1")
    );
    assert_eq!(stored(&h.credentials, ScopeKind::Durable, ACCESS_TOKEN_KEY).await, None);
}

#[tokio::test]
async fn test_bad_credentials_report_server_message() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(401)
        .with_body(r#"{"success": false, "message": "Invalid email or password"}"#)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/token-refresh")
        .expect(0)
        .create_async()
        .await;

    let h = harness(&server.url());
    let err = AuthApi::new(h.client.clone())
        .login("amina@example.org", "wrong", true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Status { status: 401, ref message } if message == "Invalid email or password"
    ));
    refresh.assert_async().await;
    assert!(!h.navigator.was_redirected());
}

#[tokio::test]
async fn test_admin_registration_is_refused_locally() {
    let mut server = Server::new_async().await;
    let register = server
        .mock("POST", "/auth/register")
        .expect(0)
        .create_async()
        .await;

    let h = harness(&server.url());
    let account = NewAccount::new("root@example.org", "pw", Role::Admin);
    let err = AuthApi::new(h.client.clone()).register(&account).await.unwrap_err();

    assert!(matches!(err, ApiError::AdminSignupDisabled));
    register.assert_async().await;
}

#[tokio::test]
async fn test_worker_registration_sends_profile() {
    let mut server = Server::new_async().await;
    let register = server
        .mock("POST", "/auth/register")
        .match_body(Matcher::PartialJson(json!({
            "role": "healthcare_worker",
            "license_number": "LIC-1",
            "facility_name": "Kenyatta Hospital"
        })))
        .with_status(201)
        .with_body(r#"{"success": true, "message": "User registered"}"#)
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server.url());
    let mut account = NewAccount::new("nurse@clinic.org", "pw", Role::HealthcareWorker);
    account.license_number = Some("LIC-1".to_string());
    account.facility_name = Some("Kenyatta Hospital".to_string());

    let user = AuthApi::new(h.client.clone()).register(&account).await.unwrap();
    assert!(user.is_none());
    register.assert_async().await;
    assert!(remaining_keys(&h.credentials).await.is_empty());
}

#[tokio::test]
async fn test_logout_clears_storage_and_returns_to_login() {
    let server = Server::new_async().await;
    let h = harness(&server.url());
    seed(&h.credentials, ScopeKind::Durable, "A1", "R1", PATIENT_USER).await;
    seed(&h.credentials, ScopeKind::Session, "A9", "R9", PATIENT_USER).await;

    AuthApi::new(h.client.clone()).logout().await;

    assert!(remaining_keys(&h.credentials).await.is_empty());
    assert_eq!(h.navigator.visited(), vec!["/".to_string()]);
}

#[tokio::test]
async fn test_facilities_list_accepts_bare_array() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/facilities")
        .with_status(200)
        .with_body(r#"[{"id": 1, "name": "Kenyatta Hospital"}, {"id": 2, "name": "Aga Khan"}]"#)
        .create_async()
        .await;

    let h = harness(&server.url());
    let facilities = FacilitiesApi::new(h.client.clone()).list().await.unwrap();
    let names: Vec<&str> = facilities.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Kenyatta Hospital", "Aga Khan"]);
}

#[tokio::test]
async fn test_grant_consent_formats_expiry() {
    let mut server = Server::new_async().await;
    let grant = server
        .mock("POST", "/api/consents")
        .match_header("authorization", "Bearer A1")
        .match_body(Matcher::Json(json!({
            "facility_name": "Aga Khan",
            "consent_type": "VIEW",
            "expires_at": "2026-01-15 13:00:00",
            "purpose": "Follow-up",
            "patient_id": 7
        })))
        .with_status(201)
        .with_body(r#"{"success": true, "data": {"consent_id": 11}}"#)
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server.url());
    seed(&h.credentials, ScopeKind::Durable, "A1", "R1", PATIENT_USER).await;
    let consent = NewConsent {
        facility_name: "Aga Khan".to_string(),
        consent_type: ConsentType::View,
        expires_at: NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap(),
        purpose: "Follow-up".to_string(),
        patient_id: 7,
    };

    let body = ConsentsApi::new(h.client.clone()).grant(&consent).await.unwrap();
    grant.assert_async().await;
    assert_eq!(body["data"]["consent_id"], 11);
}

#[tokio::test]
async fn test_patient_consents_survive_token_expiry() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/consents/patient/7")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/token-refresh")
        .with_body(r#"{"access_token": "A2"}"#)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/api/consents/patient/7")
        .match_header("authorization", "Bearer A2")
        .with_body(
            json!({
                "success": true,
                "data": [{
                    "consent_id": 3,
                    "consent_type": "VIEW",
                    "status": "ACTIVE",
                    "expires_at": "2026-12-31 00:00:00",
                    "facility": {"id": 2, "name": "Aga Khan"}
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let h = harness(&server.url());
    seed(&h.credentials, ScopeKind::Durable, "A1", "R1", PATIENT_USER).await;

    let consents = ConsentsApi::new(h.client.clone()).for_patient(7).await.unwrap();
    assert_eq!(consents.len(), 1);
    assert!(consents[0].is_active());
    assert_eq!(consents[0].facility_name(), "Aga Khan");
}

#[tokio::test]
async fn test_consent_check_encodes_id_and_parses_record() {
    let mut server = Server::new_async().await;
    let check = server
        .mock("GET", "/api/consents/check")
        .match_query(Matcher::UrlEncoded("national_id".into(), "12 34/5".into()))
        .with_body(
            json!({
                "success": true,
                "data": {
                    "first_name": "Amina",
                    "last_name": "Otieno",
                    "national_id": "12 34/5",
                    "address": "{\"city\": \"Nairobi\"}",
                    "blood_group": "O+"
                }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let h = harness(&server.url());
    seed(&h.credentials, ScopeKind::Session, "W1", "WR1", WORKER_USER).await;

    let record = ConsentsApi::new(h.client.clone())
        .check("  12 34/5 ")
        .await
        .unwrap();
    check.assert_async().await;
    assert_eq!(record.first_name.as_deref(), Some("Amina"));
    assert_eq!(record.address, Some(json!({"city": "Nairobi"})));
    assert_eq!(record.extra.get("blood_group"), Some(&json!("O+")));
}

#[tokio::test]
async fn test_consent_check_maps_failure_codes() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/consents/check")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(r#"{"success": false, "message": "consent_not_active"}"#)
        .create_async()
        .await;

    let h = harness(&server.url());
    seed(&h.credentials, ScopeKind::Session, "W1", "WR1", WORKER_USER).await;

    let err = ConsentsApi::new(h.client.clone()).check("99").await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 403);
            assert!(message.contains("inactive or has expired"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_admin_logs_accept_envelope_and_user_logs_require_one() {
    let entry = json!({
        "log_id": 1,
        "action": "VIEW",
        "result": "DENIED",
        "reason": "no consent",
        "timestamp": "2026-10-17T10:00:00Z"
    });
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/admin/access-logs")
        .with_body(json!({"success": true, "data": [entry.clone()]}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/api/access-logs/user/7")
        .with_body(json!({"success": true, "data": [entry.clone(), entry]}).to_string())
        .create_async()
        .await;

    let h = harness(&server.url());
    seed(&h.credentials, ScopeKind::Durable, "A1", "R1", PATIENT_USER).await;
    let logs = AccessLogsApi::new(h.client.clone());

    assert_eq!(logs.admin().await.unwrap().len(), 1);
    assert_eq!(logs.for_user(7).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_listings_without_data_read_as_empty() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/admin/access-logs")
        .with_body(r#"{"success": true, "data": null}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/facilities")
        .with_body("{}")
        .create_async()
        .await;

    let h = harness(&server.url());
    seed(&h.credentials, ScopeKind::Durable, "A1", "R1", PATIENT_USER).await;

    assert!(AccessLogsApi::new(h.client.clone()).admin().await.unwrap().is_empty());
    assert!(FacilitiesApi::new(h.client.clone()).list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_route_gate_follows_login_and_logout() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_body(login_body().to_string())
        .create_async()
        .await;

    let h = harness(&server.url());
    let auth = AuthApi::new(h.client.clone());

    assert_eq!(
        RouteGate::check(&Route::Patient, &h.credentials).await.unwrap(),
        GateDecision::RedirectToLogin {
            from: "/patient".to_string()
        }
    );

    auth.login("amina@example.org", "pw", false).await.unwrap();
    assert!(matches!(
        RouteGate::check(&Route::Patient, &h.credentials).await.unwrap(),
        GateDecision::Allow(Some(_))
    ));
    assert_eq!(
        RouteGate::check(&Route::parse("/admin"), &h.credentials).await.unwrap(),
        GateDecision::NotFound
    );

    auth.logout().await;
    assert!(matches!(
        RouteGate::check(&Route::Patient, &h.credentials).await.unwrap(),
        GateDecision::RedirectToLogin { .. }
    ));
}
