//! Event Bus
//!
//! Publish/subscribe registry mapping event kinds to interested plugins.
//! Delivery is synchronous, in registration order, to currently-registered
//! subscribers only; the lifecycle manager keeps membership in step with
//! plugin state.

use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};

use lodestone_core::{EventKind, HostEvent};

use crate::sdk::Plugin;

struct Subscriber {
    name: String,
    /// Handler bindings, captured once at registration.
    kinds: Vec<EventKind>,
    plugin: Arc<dyn Plugin>,
}

pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
    /// Serializes the dispatch path so no subscriber sees interleaved
    /// publishes.
    publish_lock: Mutex<()>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            publish_lock: Mutex::new(()),
        }
    }

    /// Register a plugin's declared event-handler bindings.
    /// Registering an already-registered plugin is a no-op.
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        let mut subs = self.subscribers.write().expect("subscriber lock poisoned");
        if subs.iter().any(|s| s.name == plugin.name()) {
            debug!(plugin = %plugin.name(), "Already registered; ignoring");
            return;
        }
        let kinds = plugin.subscriptions();
        debug!(plugin = %plugin.name(), bindings = kinds.len(), "Registered event subscriber");
        subs.push(Subscriber {
            name: plugin.name().to_string(),
            kinds,
            plugin,
        });
    }

    /// Remove a plugin's bindings. Unregistering an unknown plugin is a
    /// no-op.
    pub fn unregister(&self, name: &str) {
        let mut subs = self.subscribers.write().expect("subscriber lock poisoned");
        let before = subs.len();
        subs.retain(|s| s.name != name);
        if subs.len() < before {
            debug!(plugin = name, "Unregistered event subscriber");
        } else {
            debug!(plugin = name, "Not registered; ignoring unregister");
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.subscribers
            .read()
            .expect("subscriber lock poisoned")
            .iter()
            .any(|s| s.name == name)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscriber lock poisoned")
            .len()
    }

    /// Deliver the event synchronously, in registration order, to every
    /// subscriber bound to its kind.
    ///
    /// A failing handler never blocks delivery to the remaining
    /// subscribers; its error is logged and returned to the caller.
    pub fn publish(&self, event: &HostEvent) -> Vec<(String, anyhow::Error)> {
        let _dispatch = self.publish_lock.lock().expect("publish lock poisoned");

        let kind = event.kind();
        let targets: Vec<(String, Arc<dyn Plugin>)> = {
            let subs = self.subscribers.read().expect("subscriber lock poisoned");
            subs.iter()
                .filter(|s| s.kinds.contains(&kind))
                .map(|s| (s.name.clone(), s.plugin.clone()))
                .collect()
        };

        let mut errors = Vec::new();
        for (name, plugin) in targets {
            if let Err(e) = plugin.on_event(event) {
                warn!(plugin = %name, kind = %kind, error = %e, "Event handler failed");
                errors.push((name, e));
            }
        }
        errors
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct RecordingPlugin {
        name: &'static str,
        kinds: Vec<EventKind>,
        log: Arc<Mutex<Vec<String>>>,
        fail_handler: bool,
    }

    impl RecordingPlugin {
        fn new(name: &'static str, kinds: Vec<EventKind>, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                kinds,
                log,
                fail_handler: false,
            })
        }

        fn failing(name: &'static str, kinds: Vec<EventKind>, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                kinds,
                log,
                fail_handler: true,
            })
        }
    }

    #[async_trait]
    impl Plugin for RecordingPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn subscriptions(&self) -> Vec<EventKind> {
            self.kinds.clone()
        }

        async fn start_up(&self) -> Result<()> {
            Ok(())
        }

        async fn shut_down(&self) -> Result<()> {
            Ok(())
        }

        fn on_event(&self, _event: &HostEvent) -> Result<()> {
            self.log.lock().unwrap().push(self.name.to_string());
            if self.fail_handler {
                return Err(anyhow!("handler exploded"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.register(RecordingPlugin::new("first", vec![EventKind::Tick], log.clone()));
        bus.register(RecordingPlugin::new("second", vec![EventKind::Tick], log.clone()));
        bus.register(RecordingPlugin::new("third", vec![EventKind::Tick], log.clone()));

        let errors = bus.publish(&HostEvent::Tick { seq: 1 });
        assert!(errors.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_kind_filtering() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.register(RecordingPlugin::new("ticker", vec![EventKind::Tick], log.clone()));

        bus.publish(&HostEvent::SessionEnded);
        assert!(log.lock().unwrap().is_empty());

        bus.publish(&HostEvent::Tick { seq: 1 });
        assert_eq!(*log.lock().unwrap(), vec!["ticker"]);
    }

    #[test]
    fn test_register_idempotent() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let plugin = RecordingPlugin::new("dup", vec![EventKind::Tick], log.clone());
        bus.register(plugin.clone());
        bus.register(plugin);
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&HostEvent::Tick { seq: 1 });
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unregister_idempotent() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.register(RecordingPlugin::new("p", vec![EventKind::Tick], log));
        bus.unregister("p");
        bus.unregister("p");
        assert_eq!(bus.subscriber_count(), 0);
        assert!(!bus.is_registered("p"));
    }

    #[test]
    fn test_failing_handler_is_isolated() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.register(RecordingPlugin::new("a", vec![EventKind::Tick], log.clone()));
        bus.register(RecordingPlugin::failing("b", vec![EventKind::Tick], log.clone()));
        bus.register(RecordingPlugin::new("c", vec![EventKind::Tick], log.clone()));

        let errors = bus.publish(&HostEvent::Tick { seq: 1 });
        // every subscriber still saw the event
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "b");
    }
}
