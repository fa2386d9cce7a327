//! API client for communicating with the VaultCore REST API.
//!
//! Every call goes through the same pipeline: the stored access token is
//! attached as a bearer header, and a 401 on the first attempt triggers one
//! token refresh followed by exactly one retry of the original request.

use std::sync::Arc;

use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{Session, SessionEvent};
use crate::config::Config;
use crate::models::{
    Account, AccountRequest, AuthResponse, LoginRequest, MessageResponse, RefreshTokenRequest,
    SignupRequest, Transaction, TransactionRequest, TransactionType, TransferRequest,
};

use super::exchange::{Exchange, ExchangeState, OutboundRequest};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/auth/login";
const SIGNUP_PATH: &str = "/auth/signup";
const REFRESH_PATH: &str = "/auth/refresh";
const LOGOUT_PATH: &str = "/auth/logout";
const ACCOUNTS_PATH: &str = "/accounts";
const TRANSACTIONS_PATH: &str = "/transactions";
const TRANSFERS_PATH: &str = "/transfers";

/// API client for VaultCore.
/// Clone is cheap - reqwest::Client and the session are both shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
    coalesce_refresh: bool,
    refresh_gate: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a new API client bound to a session
    pub fn new(config: &Config, session: Session) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            coalesce_refresh: config.coalesce_refresh,
            refresh_gate: Arc::new(Mutex::new(())),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Fail fast for screens that only make sense with a stored token.
    pub fn ensure_signed_in(&self) -> Result<(), ApiError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::NotSignedIn)
        }
    }

    // ===== Request pipeline =====

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let url = response.url().to_string();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    /// Send one attempt with the given bearer token, no recovery.
    async fn transmit(
        &self,
        request: &OutboundRequest,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        debug!(request = %request, authenticated = token.is_some(), "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        Self::check_response(response).await
    }

    /// Run a request through the full pipeline, including the one-shot refresh.
    async fn dispatch(&self, request: OutboundRequest) -> Result<Response, ApiError> {
        let mut exchange = Exchange::new(request);
        let sent_with = self.session.access_token();

        exchange.advance(ExchangeState::Sent)?;
        let first = self.transmit(exchange.request(), sent_with.as_deref()).await;
        match first {
            Ok(response) => {
                exchange.record_outcome(true, false)?;
                Ok(response)
            }
            Err(err) if err.is_unauthorized() && exchange.may_refresh() => {
                exchange.record_outcome(false, true)?;
                self.recover(exchange, sent_with).await
            }
            Err(err) => {
                exchange.record_outcome(false, false)?;
                Err(err)
            }
        }
    }

    /// Refresh the session after a 401 and retry the request once.
    async fn recover(
        &self,
        mut exchange: Exchange,
        sent_with: Option<String>,
    ) -> Result<Response, ApiError> {
        let gate = if self.coalesce_refresh {
            Some(self.refresh_gate.lock().await)
        } else {
            None
        };

        // Another request refreshed while this one waited at the gate
        if gate.is_some() {
            let current = self
                .session
                .access_token()
                .filter(|token| Some(token) != sent_with.as_ref());
            if let Some(current) = current {
                drop(gate);
                debug!(request = %exchange.request(), "Reusing token refreshed by another request");
                exchange.advance(ExchangeState::RefreshAttempted)?;
                return self.retry(exchange, &current).await;
            }
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            warn!(request = %exchange.request(), "Unauthorized with no refresh token");
            self.session.clear_access_token();
            self.session.notify(SessionEvent::SignInRequired);
            exchange.advance(ExchangeState::RefreshFailed)?;
            return Err(ApiError::Unauthorized);
        };

        exchange.advance(ExchangeState::RefreshAttempted)?;
        let token = match self.exchange_refresh_token(&refresh_token).await {
            Ok(token) => token,
            Err(err) => {
                warn!(request = %exchange.request(), error = %err, "Token refresh failed");
                self.session.terminate();
                exchange.advance(ExchangeState::RefreshFailed)?;
                return Err(err);
            }
        };
        drop(gate);

        self.retry(exchange, &token).await
    }

    async fn retry(&self, mut exchange: Exchange, token: &str) -> Result<Response, ApiError> {
        let result = self.transmit(exchange.request(), Some(token)).await;
        exchange.record_outcome(result.is_ok(), false)?;
        if let Err(ref err) = result {
            debug!(request = %exchange.request(), error = %err, "Retried request failed");
        }
        result
    }

    /// Trade a refresh token for a new access token and store the result.
    /// The refresh call carries no bearer header and is never itself refreshed.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let request = OutboundRequest::post(REFRESH_PATH).json(&RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        })?;
        let response = self.transmit(&request, None).await?;
        let auth: AuthResponse = Self::parse(response).await?;
        if auth.token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Refresh response did not include a token".to_string(),
            ));
        }

        self.session
            .store_tokens(&auth.token, auth.refresh_token.as_deref());
        self.session.notify(SessionEvent::Refreshed);
        info!(rotated = auth.refresh_token.is_some(), "Access token refreshed");
        Ok(auth.token)
    }

    /// Send a request and deserialize the JSON response.
    pub async fn send<T: DeserializeOwned>(&self, request: OutboundRequest) -> Result<T, ApiError> {
        let response = self.dispatch(request).await?;
        Self::parse(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(OutboundRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(OutboundRequest::post(path).json(body)?).await
    }

    // ===== Auth =====

    /// Sign in and store the returned token pair
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self.post(LOGIN_PATH, &body).await?;
        if auth.token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Login response did not include a token".to_string(),
            ));
        }

        self.session
            .store_tokens(&auth.token, auth.refresh_token.as_deref());
        self.session.notify(SessionEvent::SignedIn);
        info!(email = email, "Signed in");
        Ok(auth)
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<MessageResponse, ApiError> {
        self.post(SIGNUP_PATH, request).await
    }

    /// Refresh the access token ahead of a 401.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let Some(refresh_token) = self.session.refresh_token() else {
            self.session.clear_access_token();
            self.session.notify(SessionEvent::SignInRequired);
            return Err(ApiError::NotSignedIn);
        };

        match self.exchange_refresh_token(&refresh_token).await {
            Ok(_) => Ok(()),
            Err(err) => {
                self.session.terminate();
                Err(err)
            }
        }
    }

    /// Revoke the refresh token server-side (best effort) and clear the session.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.session.refresh_token() {
            let request = OutboundRequest::post(LOGOUT_PATH).json(&RefreshTokenRequest {
                refresh_token,
            });
            let access = self.session.access_token();
            let result = match request {
                Ok(request) => self.transmit(&request, access.as_deref()).await.map(|_| ()),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                warn!(error = %e, "Remote logout failed, clearing local session anyway");
            }
        }
        self.session.sign_out();
    }

    // ===== Accounts =====

    pub async fn accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.get(ACCOUNTS_PATH).await
    }

    pub async fn create_account(&self, request: &AccountRequest) -> Result<Account, ApiError> {
        request.validate().map_err(ApiError::BadRequest)?;
        self.post(ACCOUNTS_PATH, request).await
    }

    // ===== Transactions =====

    pub async fn transactions(&self) -> Result<Vec<Transaction>, ApiError> {
        self.get(TRANSACTIONS_PATH).await
    }

    pub async fn perform_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Transaction, ApiError> {
        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(ApiError::BadRequest("Amount must be positive".to_string()));
        }
        if request.kind == TransactionType::Other {
            return Err(ApiError::BadRequest(
                "Transaction type must be DEBIT or CREDIT".to_string(),
            ));
        }
        self.post(TRANSACTIONS_PATH, request).await
    }

    pub async fn transfer(&self, request: &TransferRequest) -> Result<MessageResponse, ApiError> {
        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(ApiError::BadRequest(
                "Transfer amount must be positive".to_string(),
            ));
        }
        self.post(TRANSFERS_PATH, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        let config = Config {
            base_url: base_url.to_string(),
            ..Config::default()
        };
        ApiClient::new(&config, Session::in_memory()).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let api = client("http://localhost:8080/api/");
        assert_eq!(api.base_url(), "http://localhost:8080/api");
        assert_eq!(api.url("/accounts"), "http://localhost:8080/api/accounts");
        assert_eq!(api.url("transactions"), "http://localhost:8080/api/transactions");
    }

    #[test]
    fn test_ensure_signed_in() {
        let api = client("http://localhost:8080/api");
        assert!(matches!(api.ensure_signed_in(), Err(ApiError::NotSignedIn)));
        api.session().store_tokens("a1", None);
        assert!(api.ensure_signed_in().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_amounts_never_leave_the_client() {
        let api = client("http://127.0.0.1:9/api");
        let err = api
            .transfer(&TransferRequest {
                from_account_id: "a".into(),
                to_account_id: "b".into(),
                amount: 0.0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = api
            .perform_transaction(&TransactionRequest {
                account_id: "a".into(),
                amount: 5.0,
                kind: TransactionType::Other,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = api
            .create_account(&AccountRequest {
                account_type: String::new(),
                initial_balance: 5.0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
