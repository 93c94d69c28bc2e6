//! Optional host capability hooks.
//!
//! The embedding application opts into each inbound category separately:
//! a capability it does not register is simply never invoked. One trait
//! per hook keeps dispatch explicit and each capability testable on its
//! own.

use serde_json::Value;

/// Receives applied partial updates (JSON.SET / JSON.DEL).
pub trait UpdateHook: Send + Sync {
    /// `value` is `None` for removals.
    fn on_update(&self, value: Option<&Value>, path: &str);
}

/// Receives NOTIFY actions other than the JSON patch pair, verbatim.
pub trait NotifyHook: Send + Sync {
    fn on_notify(&self, action: &str, value: Option<&Value>, path: &str);
}

/// Receives MULTICAST / BROADCAST fan-out payloads.
pub trait MulticastHook: Send + Sync {
    fn on_multicast(&self, params: &Value);
}

/// Receives raw binary streaming frames (header still attached).
pub trait StreamingHook: Send + Sync {
    fn on_streaming(&self, bytes: &[u8]);
}

/// Connection lifecycle notifications.
pub trait LifecycleHook: Send + Sync {
    fn on_open(&self) {}
    fn on_close(&self) {}
    fn on_error(&self, _message: &str) {}
}

/// The capability set a router dispatches into.
#[derive(Default)]
pub struct Hooks {
    pub(crate) update: Option<Box<dyn UpdateHook>>,
    pub(crate) notify: Option<Box<dyn NotifyHook>>,
    pub(crate) multicast: Option<Box<dyn MulticastHook>>,
    pub(crate) streaming: Option<Box<dyn StreamingHook>>,
    pub(crate) lifecycle: Option<Box<dyn LifecycleHook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register the update capability.
    pub fn on_update(mut self, hook: impl UpdateHook + 'static) -> Self {
        self.update = Some(Box::new(hook));
        self
    }

    /// Builder: register the notify capability.
    pub fn on_notify(mut self, hook: impl NotifyHook + 'static) -> Self {
        self.notify = Some(Box::new(hook));
        self
    }

    /// Builder: register the multicast capability.
    pub fn on_multicast(mut self, hook: impl MulticastHook + 'static) -> Self {
        self.multicast = Some(Box::new(hook));
        self
    }

    /// Builder: register the streaming capability.
    pub fn on_streaming(mut self, hook: impl StreamingHook + 'static) -> Self {
        self.streaming = Some(Box::new(hook));
        self
    }

    /// Builder: register the lifecycle capability.
    pub fn on_lifecycle(mut self, hook: impl LifecycleHook + 'static) -> Self {
        self.lifecycle = Some(Box::new(hook));
        self
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("update", &self.update.is_some())
            .field("notify", &self.notify.is_some())
            .field("multicast", &self.multicast.is_some())
            .field("streaming", &self.streaming.is_some())
            .field("lifecycle", &self.lifecycle.is_some())
            .finish()
    }
}
