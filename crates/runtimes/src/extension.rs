// SPDX-License-Identifier: MIT

//! The extension VM seam: a fixed set of named callbacks any embeddable
//! scripting engine can satisfy. This crate ships [`NullVm`], which
//! no-ops every callback and never subscribes to a channel — a real
//! engine binding implements this same trait.

use std::borrow::Cow;

/// Connection-scoped context passed into most callbacks.
pub struct ConnCtx<'a> {
    pub connection_id: u64,
    pub metadata: &'a std::collections::HashMap<String, String>,
}

/// Auth decision returned by `on_auth`; gates connection admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    Deny,
}

pub trait ExtensionVm: Send {
    fn on_connect(&mut self, _ctx: &ConnCtx<'_>) {}
    fn on_disconnect(&mut self, _ctx: &ConnCtx<'_>) {}
    fn on_message(&mut self, _ctx: &ConnCtx<'_>, _payload: &[u8]) {}
    fn on_client_message(&mut self, _payload: &[u8]) {}
    fn on_tick(&mut self) {}
    fn on_websocket(&mut self, _ctx: &ConnCtx<'_>, _payload: &[u8]) {}
    fn on_http_request(&mut self, _ctx: &ConnCtx<'_>, _method: &str, _path: &str) {}

    /// Gates admission; the default allows every connection.
    fn on_auth(&mut self, _ctx: &ConnCtx<'_>, _credential: Option<&str>) -> AuthDecision {
        AuthDecision::Allow
    }

    /// Subscriptions this VM currently holds, for registry pub/sub
    /// dispatch. Default: none.
    fn subscriptions(&self) -> Cow<'_, [String]> {
        Cow::Borrowed(&[])
    }

    /// Deliver a publication this VM is subscribed to.
    fn on_publish(&mut self, _channel: &str, _message: &[u8]) {}

    /// For the proxy's `script` strategy: choose a backend by index
    /// into `candidates`. The default defers to round-robin.
    fn select_backend(&mut self, _candidates: &[String]) -> Option<usize> {
        None
    }
}

/// The default extension VM: every callback no-ops, every connection
/// is admitted, no channel is ever subscribed to.
#[derive(Debug, Default)]
pub struct NullVm;

impl ExtensionVm for NullVm {}
