//! Test doubles for code that depends on the session layer

use crate::clock::Clock;
use crate::navigation::Navigator;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use std::cell::{Cell, RefCell};

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn at_timestamp(seconds: i64) -> Self {
        Self::new(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Navigator that remembers every route it was asked to visit
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: RefCell<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visited.borrow().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.visited.borrow_mut().push(route.to_string());
    }
}

/// Build an unsigned credential carrying `claims` as its payload
pub fn unsigned_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
