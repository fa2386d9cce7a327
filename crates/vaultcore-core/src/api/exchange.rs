//! Outbound request description and the per-request refresh state machine.
//!
//! An `Exchange` follows one logical request from first send to a terminal
//! state. The refresh-and-retry cycle can be entered at most once, which is
//! what keeps a request from refreshing twice when the retried call also
//! comes back 401.

use std::fmt;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// A request destined for the API, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body. Serialization failures surface when the body is
    /// built, not when the request is sent.
    pub fn json<B: Serialize>(mut self, body: &B) -> serde_json::Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

impl fmt::Display for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Initial,
    Sent,
    Success,
    /// First attempt failed with something other than a 401.
    Failed,
    AuthFailed,
    RefreshAttempted,
    RetriedSuccess,
    RetriedFailed,
    /// Refresh call failed, or there was no refresh token to try.
    RefreshFailed,
}

impl ExchangeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExchangeState::Success
                | ExchangeState::Failed
                | ExchangeState::RetriedSuccess
                | ExchangeState::RetriedFailed
                | ExchangeState::RefreshFailed
        )
    }

    fn can_advance_to(self, next: ExchangeState) -> bool {
        use ExchangeState::*;
        matches!(
            (self, next),
            (Initial, Sent)
                | (Sent, Success)
                | (Sent, Failed)
                | (Sent, AuthFailed)
                | (AuthFailed, RefreshAttempted)
                | (AuthFailed, RefreshFailed)
                | (RefreshAttempted, RetriedSuccess)
                | (RefreshAttempted, RetriedFailed)
                | (RefreshAttempted, RefreshFailed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: ExchangeState,
    pub to: ExchangeState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal exchange transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// One logical request and where it is in its lifecycle.
#[derive(Debug)]
pub struct Exchange {
    request: OutboundRequest,
    state: ExchangeState,
}

impl Exchange {
    pub fn new(request: OutboundRequest) -> Self {
        Self {
            request,
            state: ExchangeState::Initial,
        }
    }

    pub fn request(&self) -> &OutboundRequest {
        &self.request
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Whether a 401 on the current attempt may still trigger a refresh.
    pub fn may_refresh(&self) -> bool {
        self.state == ExchangeState::Sent
    }

    pub fn advance(&mut self, next: ExchangeState) -> Result<(), IllegalTransition> {
        if !self.state.can_advance_to(next) {
            return Err(IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(request = %self.request, from = ?self.state, to = ?next, "Exchange transition");
        self.state = next;
        Ok(())
    }

    /// Record the outcome of the attempt that was just sent.
    pub fn record_outcome(&mut self, ok: bool, unauthorized: bool) -> Result<(), IllegalTransition> {
        let next = match (self.state, ok) {
            (ExchangeState::Sent, true) => ExchangeState::Success,
            (ExchangeState::Sent, false) if unauthorized => ExchangeState::AuthFailed,
            (ExchangeState::Sent, false) => ExchangeState::Failed,
            (ExchangeState::RefreshAttempted, true) => ExchangeState::RetriedSuccess,
            (ExchangeState::RefreshAttempted, false) => ExchangeState::RetriedFailed,
            (from, _) => {
                return Err(IllegalTransition {
                    from,
                    to: ExchangeState::Failed,
                })
            }
        };
        self.advance(next)
    }
}
