use serde_json::json;
use vaultcore_core::models::{
    AccountRequest, SignupRequest, TransactionRequest, TransactionType, TransferRequest,
};
use vaultcore_core::{ApiClient, ApiError, Config, Session, SessionEvent};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, session: Session) -> ApiClient {
    let config = Config {
        base_url: format!("{}/api", server.uri()),
        ..Config::default()
    };
    ApiClient::new(&config, session).unwrap()
}

#[tokio::test]
async fn test_login_stores_token_pair() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "ada@example.com", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "a1",
            "refreshToken": "r1",
            "type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    let mut events = session.subscribe();
    let api = client_for(&server, session.clone());

    let auth = api.login("ada@example.com", "hunter2").await.unwrap();
    assert_eq!(auth.token, "a1");
    assert_eq!(session.access_token().as_deref(), Some("a1"));
    assert_eq!(session.refresh_token().as_deref(), Some("r1"));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn);
}

#[tokio::test]
async fn test_bad_credentials_leave_session_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let session = Session::in_memory();
    let api = client_for(&server, session.clone());
    match api.login("ada@example.com", "wrong").await.unwrap_err() {
        ApiError::BadRequest(msg) => assert_eq!(msg, "Invalid credentials"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_signup_returns_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signup"))
        .and(body_json(json!({
            "email": "ada@example.com",
            "password": "hunter2",
            "role": "USER"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "User registered successfully" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = client_for(&server, Session::in_memory());
    let response = api
        .signup(&SignupRequest {
            email: "ada@example.com".into(),
            password: "hunter2".into(),
            role: "USER".into(),
        })
        .await
        .unwrap();
    assert_eq!(response.message, "User registered successfully");
}

#[tokio::test]
async fn test_logout_clears_session_even_when_remote_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.store_tokens("a1", Some("r1"));
    let mut events = session.subscribe();
    let api = client_for(&server, session.clone());

    api.logout().await;
    assert_eq!(session.access_token(), None);
    assert_eq!(session.refresh_token(), None);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
}

#[tokio::test]
async fn test_explicit_refresh_without_refresh_token() {
    let server = MockServer::start().await;
    let session = Session::in_memory();
    session.store_tokens("a1", None);
    let api = client_for(&server, session.clone());

    assert!(matches!(api.refresh().await, Err(ApiError::NotSignedIn)));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_explicit_refresh_stores_new_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "a2",
            "refreshToken": "r2",
            "type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.store_tokens("a1", Some("r1"));
    let mut events = session.subscribe();
    let api = client_for(&server, session.clone());

    api.refresh().await.unwrap();
    assert_eq!(session.access_token().as_deref(), Some("a2"));
    assert_eq!(session.refresh_token().as_deref(), Some("r2"));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Refreshed);
}

#[tokio::test]
async fn test_explicit_refresh_failure_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Refresh token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.store_tokens("a1", Some("r1"));
    let mut events = session.subscribe();
    let api = client_for(&server, session.clone());

    match api.refresh().await.unwrap_err() {
        ApiError::BadRequest(msg) => assert_eq!(msg, "Refresh token expired"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.access_token(), None);
    assert_eq!(session.refresh_token(), None);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignInRequired);
}

#[tokio::test]
async fn test_create_account_and_transactions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/accounts"))
        .and(header("authorization", "Bearer a1"))
        .and(body_json(json!({ "accountType": "CHECKING", "initialBalance": 25.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "acc-9",
            "accountType": "CHECKING",
            "balance": 25.0
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "t1", "amount": 10.0, "type": "CREDIT", "timestamp": "2025-01-02T03:04:05" },
            { "id": "t2", "amount": 4.5, "type": "DEBIT" }
        ])))
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.store_tokens("a1", Some("r1"));
    let api = client_for(&server, session);

    let account = api
        .create_account(&AccountRequest {
            account_type: "CHECKING".into(),
            initial_balance: 25.0,
        })
        .await
        .unwrap();
    assert_eq!(account.id, "acc-9");

    let transactions = api.transactions().await.unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].kind, TransactionType::Credit);
    assert_eq!(transactions[1].display_amount(), "- $4.50");
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let api = client_for(&server, Session::in_memory());
    assert!(matches!(
        api.accounts().await.unwrap_err(),
        ApiError::InvalidResponse(_)
    ));
}

#[tokio::test]
async fn test_perform_transaction_and_transfer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/transactions"))
        .and(body_json(json!({ "accountId": "acc-1", "amount": 20.0, "type": "DEBIT" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t9",
            "amount": 20.0,
            "type": "DEBIT",
            "timestamp": "2025-06-01T12:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/transfers"))
        .and(body_json(json!({ "fromAccountId": "acc-1", "toAccountId": "acc-2", "amount": 5.0 })))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Insufficient balance" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::in_memory();
    session.store_tokens("a1", Some("r1"));
    let api = client_for(&server, session);

    let txn = api
        .perform_transaction(&TransactionRequest {
            account_id: "acc-1".into(),
            amount: 20.0,
            kind: TransactionType::Debit,
        })
        .await
        .unwrap();
    assert_eq!(txn.id, "t9");

    match api
        .transfer(&TransferRequest {
            from_account_id: "acc-1".into(),
            to_account_id: "acc-2".into(),
            amount: 5.0,
        })
        .await
        .unwrap_err()
    {
        ApiError::BadRequest(msg) => assert_eq!(msg, "Insufficient balance"),
        other => panic!("unexpected error: {other:?}"),
    }
}
