//! Integration tests for the identity client and the request interceptor

use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::rc::Rc;
use std::time::Duration;
use tienda_core::tests::RecordingNavigator;
use tienda_core::{
    AuthError, KeyValueStorage, MemoryStorage, RegistrationFields, RegistrationOutcome, Role,
    SessionAuthority, SessionConfig,
};
use tienda_http::{ApiClient, ClientError, IdentityClient, Interceptor, TiendaClient};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Sign a credential expiring `expires_in` seconds from now
fn signed_token(subject: &str, role: &str, expires_in: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": subject,
        "nombre": "Ana Torres",
        "username": subject,
        "email": format!("{subject}@tienda.test"),
        "roles": role,
        "iat": now,
        "exp": now + expires_in,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"tienda-test-secret"),
    )
    .unwrap()
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

struct Harness {
    authority: SessionAuthority,
    api: ApiClient,
    navigator: Rc<RecordingNavigator>,
}

async fn harness(server: &MockServer, stored: Option<&str>) -> Harness {
    harness_at(format!("{}/api/", server.uri()), stored)
}

fn harness_at(api_base_url: String, stored: Option<&str>) -> Harness {
    init_tracing();

    let config = SessionConfig {
        api_base_url,
        ..SessionConfig::default()
    };

    let storage = Rc::new(MemoryStorage::new());
    if let Some(token) = stored {
        storage.set_item(&config.token_key, token).unwrap();
    }

    let navigator = Rc::new(RecordingNavigator::new());
    let client = TiendaClient::from_config(&config).unwrap();
    let authority = SessionAuthority::builder(config.clone())
        .storage(storage)
        .provider(Rc::new(IdentityClient::new(client.clone(), config)))
        .navigator(navigator.clone())
        .build()
        .unwrap();
    let api = ApiClient::new(Interceptor::new(authority.clone(), client));

    Harness {
        authority,
        api,
        navigator,
    }
}

#[tokio::test]
async fn test_protected_request_carries_bearer_credential() {
    let server = MockServer::start().await;
    let token = signed_token("ana", "CLIENTE", 3600);

    Mock::given(method("GET"))
        .and(path("/api/productos"))
        .and(header("authorization", bearer(&token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some(&token)).await;
    let products: Value = h.api.get("productos").await.unwrap();

    assert_eq!(products, json!([{"id": 1}]));
}

#[tokio::test]
async fn test_public_endpoint_never_carries_credential() {
    let server = MockServer::start().await;
    let token = signed_token("ana", "CLIENTE", 3600);

    Mock::given(method("POST"))
        .and(path("/api/auth/registro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .mount(&server)
        .await;

    let h = harness(&server, Some(&token)).await;
    let answer: Value = h
        .api
        .post("auth/registro", &json!({"username": "nuevo"}))
        .await
        .unwrap();
    assert_eq!(answer["message"], "ok");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_unauthorized_near_expiry_renews_and_retries_once() {
    let server = MockServer::start().await;
    let old = signed_token("ana", "CLIENTE", 120);
    let renewed = signed_token("ana", "CLIENTE", 3600);

    Mock::given(method("GET"))
        .and(path("/api/pedidos"))
        .and(header("authorization", bearer(&old).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/pedidos"))
        .and(header("authorization", bearer(&renewed).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 7}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({"token": old})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": renewed})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some(&old)).await;
    let orders: Value = h.api.get("pedidos").await.unwrap();

    assert_eq!(orders, json!([{"id": 7}]));
    assert_eq!(h.authority.credential(), Some(renewed));
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn test_unauthorized_far_from_expiry_ends_session_without_renewal() {
    let server = MockServer::start().await;
    let token = signed_token("ana", "CLIENTE", 3600);

    Mock::given(method("GET"))
        .and(path("/api/pedidos"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server, Some(&token)).await;
    let result = h.api.get::<Value>("pedidos").await;

    assert!(matches!(result, Err(ClientError::SessionExpired)));
    assert_eq!(h.authority.credential(), None);
    assert_eq!(h.navigator.last().as_deref(), Some("/auth/login"));
}

#[tokio::test]
async fn test_concurrent_unauthorized_responses_share_one_renewal() {
    let server = MockServer::start().await;
    let old = signed_token("ana", "CLIENTE", 60);
    let renewed = signed_token("ana", "CLIENTE", 7200);

    for resource in ["/api/pedidos", "/api/carrito"] {
        Mock::given(method("GET"))
            .and(path(resource))
            .and(header("authorization", bearer(&old).as_str()))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(resource))
            .and(header("authorization", bearer(&renewed).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": resource})))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": renewed}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some(&old)).await;
    let (orders, cart) = tokio::join!(
        h.api.get::<Value>("pedidos"),
        h.api.get::<Value>("carrito")
    );

    assert_eq!(orders.unwrap()["ok"], "/api/pedidos");
    assert_eq!(cart.unwrap()["ok"], "/api/carrito");
    assert_eq!(h.authority.credential(), Some(renewed));
}

#[tokio::test]
async fn test_late_unauthorized_response_reuses_finished_renewal() {
    let server = MockServer::start().await;
    let old = signed_token("ana", "CLIENTE", 60);
    let renewed = signed_token("ana", "CLIENTE", 7200);

    Mock::given(method("GET"))
        .and(path("/api/pedidos"))
        .and(header("authorization", bearer(&old).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    // Rejected with the old credential, but only after the renewal is over
    Mock::given(method("GET"))
        .and(path("/api/carrito"))
        .and(header("authorization", bearer(&old).as_str()))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(600)))
        .expect(1)
        .mount(&server)
        .await;
    for resource in ["/api/pedidos", "/api/carrito"] {
        Mock::given(method("GET"))
            .and(path(resource))
            .and(header("authorization", bearer(&renewed).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": resource})))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": renewed})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some(&old)).await;
    let (orders, cart) = tokio::join!(
        h.api.get::<Value>("pedidos"),
        h.api.get::<Value>("carrito")
    );

    assert_eq!(orders.unwrap()["ok"], "/api/pedidos");
    assert_eq!(cart.unwrap()["ok"], "/api/carrito");
    assert_eq!(h.authority.credential(), Some(renewed));
    assert!(h.authority.is_authenticated());
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn test_unauthorized_from_public_endpoint_passes_through() {
    let server = MockServer::start().await;
    // Close enough to expiry that a protected 401 would trigger a renewal
    let stored = signed_token("ana", "CLIENTE", 60);

    for endpoint in ["/api/auth/login", "/api/auth/registro", "/api/auth/refresh"] {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "denied"})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let h = harness(&server, Some(&stored)).await;
    for endpoint in ["auth/login", "auth/registro", "auth/refresh"] {
        let result = h.api.post::<_, Value>(endpoint, &json!({"email": "ana@tienda.test"})).await;
        assert!(
            matches!(result, Err(ClientError::AuthenticationFailed(_))),
            "{endpoint}: {result:?}"
        );
    }

    // Each endpoint was hit exactly once, so no renewal call was made
    assert_eq!(h.authority.credential(), Some(stored));
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn test_failed_renewal_ends_session() {
    let server = MockServer::start().await;
    let old = signed_token("ana", "CLIENTE", 60);

    Mock::given(method("GET"))
        .and(path("/api/pedidos"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some(&old)).await;
    let result = h.api.get::<Value>("pedidos").await;

    assert!(matches!(result, Err(ClientError::SessionExpired)));
    assert_eq!(h.authority.credential(), None);
    assert!(!h.authority.is_authenticated());
    assert_eq!(h.navigator.last().as_deref(), Some("/auth/login"));
}

#[tokio::test]
async fn test_retry_failure_is_surfaced_without_second_renewal() {
    let server = MockServer::start().await;
    let old = signed_token("ana", "CLIENTE", 60);
    let renewed = signed_token("ana", "CLIENTE", 3600);

    Mock::given(method("GET"))
        .and(path("/api/pedidos"))
        .respond_with(ResponseTemplate::new(401).set_body_string("still unauthorized"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": renewed})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some(&old)).await;
    let result = h.api.get::<Value>("pedidos").await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed(ref m)) if m == "still unauthorized"));
    assert_eq!(h.authority.credential(), Some(renewed));
}

#[tokio::test]
async fn test_forbidden_ends_session_without_renewal() {
    let server = MockServer::start().await;
    let token = signed_token("ana", "CLIENTE", 60);

    Mock::given(method("DELETE"))
        .and(path("/api/productos/3"))
        .respond_with(ResponseTemplate::new(403).set_body_string("solo administradores"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server, Some(&token)).await;
    let result = h.api.delete("productos/3").await;

    assert!(matches!(result, Err(ClientError::PermissionDenied(ref m)) if m == "solo administradores"));
    assert_eq!(h.authority.credential(), None);
    assert_eq!(h.navigator.visited(), vec!["/auth/login".to_string()]);
}

#[tokio::test]
async fn test_other_errors_pass_through_without_side_effects() {
    let server = MockServer::start().await;
    let token = signed_token("ana", "CLIENTE", 3600);

    Mock::given(method("GET"))
        .and(path("/api/productos/99"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no existe"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/productos/1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let h = harness(&server, Some(&token)).await;

    let missing = h.api.get::<Value>("productos/99").await;
    assert!(matches!(missing, Err(ClientError::NotFound(_))));

    let broken = h
        .api
        .put::<_, Value>("productos/1", &json!({"precio": 10}))
        .await;
    assert!(matches!(broken, Err(ClientError::ServerError { status: 500, .. })));

    assert_eq!(h.authority.credential(), Some(token));
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn test_login_stores_credential_and_role() {
    let server = MockServer::start().await;
    let issued = signed_token("admin", "ADMINISTRADOR", 3600);

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"username": "admin", "password": "secreto"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": issued, "status": 200})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, None).await;
    let session = h.authority.login("admin", "secreto").await.unwrap();

    assert_eq!(session.user.role, Some(Role::Administrador));
    assert_eq!(h.authority.credential(), Some(issued));
    assert!(h.authority.is_admin());
    assert_eq!(h.authority.username().as_deref(), Some("admin"));

    let received = server.received_requests().await.unwrap();
    assert!(!received[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_login_without_token_stores_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Cuenta bloqueada"})),
        )
        .mount(&server)
        .await;

    let h = harness(&server, None).await;
    let result = h.authority.login("ana", "secreto").await;

    assert_eq!(
        result.unwrap_err(),
        AuthError::InvalidResponse("Cuenta bloqueada".to_string())
    );
    assert_eq!(h.authority.credential(), None);
}

#[tokio::test]
async fn test_rejected_login_clears_stale_credential() {
    let server = MockServer::start().await;
    let stale = signed_token("ana", "CLIENTE", 3600);

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Credenciales incorrectas"})),
        )
        .mount(&server)
        .await;

    let h = harness(&server, Some(&stale)).await;
    let result = h.authority.login("ana", "mala").await;

    match result {
        Err(AuthError::Rejected(status, message)) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "Credenciales incorrectas");
        }
        other => panic!("unexpected login result: {other:?}"),
    }
    assert_eq!(h.authority.credential(), None);
    assert!(h.navigator.visited().is_empty());
}

#[tokio::test]
async fn test_login_transport_failure() {
    // Nothing listens on the discard port
    let h = harness_at("http://127.0.0.1:9/api/".to_string(), None);

    let result = h.authority.login("ana", "secreto").await;
    assert!(matches!(result, Err(AuthError::Transport(_))));
}

#[tokio::test]
async fn test_register_sends_client_role() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/registro"))
        .and(body_partial_json(json!({
            "username": "nuevo",
            "email": "nuevo@tienda.test",
            "nombre": "Nuevo",
            "rol": "CLIENTE",
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"message": "Usuario registrado"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, None).await;
    let outcome = h
        .authority
        .register(RegistrationFields {
            username: "nuevo".into(),
            email: "nuevo@tienda.test".into(),
            password: "secreto".into(),
            nombre: "Nuevo".into(),
            apellido: "Cliente".into(),
            telefono: "555-0100".into(),
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RegistrationOutcome::Registered {
            message: Some("Usuario registrado".into())
        }
    );
    assert_eq!(h.authority.credential(), None);
}

#[tokio::test]
async fn test_register_with_token_signs_in() {
    let server = MockServer::start().await;
    let issued = signed_token("nuevo", "CLIENTE", 3600);

    Mock::given(method("POST"))
        .and(path("/api/auth/registro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": issued})))
        .mount(&server)
        .await;

    let h = harness(&server, None).await;
    let outcome = h
        .authority
        .register(RegistrationFields {
            username: "nuevo".into(),
            password: "secreto".into(),
            ..RegistrationFields::default()
        })
        .await
        .unwrap();

    assert!(matches!(outcome, RegistrationOutcome::SignedIn(_)));
    assert!(h.authority.is_client());
}
