//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(String, Value) -> Fut`, producing a
//! fresh future per attempt. This avoids shared mutable state between
//! attempts; if shared state is needed, move an `Arc<...>` into the closure
//! explicitly.
//!
//! ## Example
//! ```rust
//! use durabus::{HandlerFn, HandlerRef, HandlerError};
//! use serde_json::Value;
//!
//! let h: HandlerRef = HandlerFn::arc("charge-card", |_event_id: String, content: Value| async move {
//!     if content["amount"].is_null() {
//!         return Err(HandlerError::fail("missing amount"));
//!     }
//!     Ok(())
//! });
//!
//! assert_eq!(h.name(), "charge-card");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HandlerError;
use crate::handlers::handler::Handler;

/// Function-backed handler implementation.
///
/// Wraps a closure that *creates* a new future per delivery attempt.
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a
    /// [`HandlerRef`](crate::HandlerRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event_id: &str, content: &Value) -> Result<(), HandlerError> {
        (self.f)(event_id.to_owned(), content.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_closure_receives_id_and_content() {
        let h = HandlerFn::new("echo", |event_id: String, content: Value| async move {
            if event_id == "e-1" && content == json!({"x": 1}) {
                Ok(())
            } else {
                Err(HandlerError::fail("unexpected input"))
            }
        });

        assert!(h.handle("e-1", &json!({"x": 1})).await.is_ok());
        assert!(h.handle("e-2", &json!({"x": 1})).await.is_err());
    }
}
