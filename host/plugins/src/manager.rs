//! Plugin lifecycle manager.
//!
//! Owns the plugin set, drives each plugin through the lifecycle state
//! machine on its own task, and keeps event-bus membership synchronized
//! with state: a plugin is a subscriber exactly while it is running.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lodestone_config::ConfigStore;
use lodestone_core::HostEvent;

use crate::event_bus::EventBus;
use crate::lifecycle::{FailureKind, FailureRecord, PluginState, Transition};
use crate::sdk::{Plugin, PluginContext, PluginFactory};

/// Buffer for the transition notice channel; lagging observers drop old
/// notices rather than stalling transitions.
const NOTICE_CAPACITY: usize = 64;

/// Cheaply-cloneable handle to the lifecycle manager. All clones share the
/// same plugin set and state.
#[derive(Clone)]
pub struct PluginManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    bus: Arc<EventBus>,
    store: Arc<ConfigStore>,
    /// Loaded plugins, in load order.
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    states: RwLock<HashMap<String, PluginState>>,
    failures: RwLock<HashMap<String, FailureRecord>>,
    /// Serializes transition application so state and bus membership are
    /// never observed half-updated.
    transition_lock: Mutex<()>,
    notices: broadcast::Sender<Transition>,
}

impl PluginManager {
    pub fn new(bus: Arc<EventBus>, store: Arc<ConfigStore>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            inner: Arc::new(ManagerInner {
                bus,
                store,
                plugins: RwLock::new(Vec::new()),
                states: RwLock::new(HashMap::new()),
                failures: RwLock::new(HashMap::new()),
                transition_lock: Mutex::new(()),
                notices,
            }),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.inner.bus
    }

    /// Observe applied transitions.
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<Transition> {
        self.inner.notices.subscribe()
    }

    /// Instantiate every factory and request concurrent start-up.
    ///
    /// Developer-only factories are skipped unless `developer_mode` is set.
    /// Returns once the start tasks are spawned; the handles let callers
    /// await completion, but `load_all` itself does not block on any
    /// plugin's `start_up`.
    pub fn load_all(
        &self,
        factories: Vec<PluginFactory>,
        developer_mode: bool,
    ) -> Vec<JoinHandle<()>> {
        if developer_mode {
            info!("Loading developer plugins");
        }

        let ctx = PluginContext {
            store: self.inner.store.clone(),
        };

        let mut loaded = Vec::new();
        for factory in &factories {
            if factory.developer_only && !developer_mode {
                continue;
            }
            let plugin = factory.construct(&ctx);
            let name = plugin.name().to_string();
            {
                let mut states = self.inner.states.write().expect("state lock poisoned");
                if states.contains_key(&name) {
                    warn!(plugin = %name, "Duplicate plugin name; skipping");
                    continue;
                }
                states.insert(name.clone(), PluginState::Idle);
            }
            self.inner
                .plugins
                .write()
                .expect("plugin lock poisoned")
                .push(plugin.clone());
            loaded.push((name, plugin));
        }

        info!(count = loaded.len(), "Starting plugins");
        loaded
            .into_iter()
            .map(|(name, plugin)| {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    if !inner.apply_transition(&name, PluginState::Starting, None) {
                        return;
                    }
                    match plugin.start_up().await {
                        Ok(()) => {
                            inner.apply_transition(&name, PluginState::Running, None);
                        }
                        Err(e) => {
                            inner.apply_transition(
                                &name,
                                PluginState::Failed,
                                Some((FailureKind::Startup, format!("{e:#}"))),
                            );
                        }
                    }
                })
            })
            .collect()
    }

    /// Request an orderly stop. A no-op unless the plugin is running.
    pub fn stop(&self, name: &str) -> Option<JoinHandle<()>> {
        let plugin = self.inner.plugin(name)?;
        if self.state(name) != Some(PluginState::Running) {
            debug!(plugin = name, "Stop requested but plugin is not running");
            return None;
        }
        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        Some(tokio::spawn(async move {
            if !inner.apply_transition(&name, PluginState::Stopping, None) {
                return;
            }
            match plugin.shut_down().await {
                Ok(()) => {
                    inner.apply_transition(&name, PluginState::Terminated, None);
                }
                Err(e) => {
                    inner.apply_transition(
                        &name,
                        PluginState::Failed,
                        Some((FailureKind::Shutdown, format!("{e:#}"))),
                    );
                }
            }
        }))
    }

    /// Stop every running plugin; returns the stop-task handles.
    pub fn stop_all(&self) -> Vec<JoinHandle<()>> {
        let names: Vec<String> = self
            .running_plugins()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        names.iter().filter_map(|name| self.stop(name)).collect()
    }

    /// Take a running plugin out of service after a runtime failure.
    pub fn fail(&self, name: &str, cause: impl Into<String>) -> bool {
        self.inner.apply_transition(
            name,
            PluginState::Failed,
            Some((FailureKind::Runtime, cause.into())),
        )
    }

    /// The host's publish entry: deliver the event through the bus, then
    /// fail any plugin whose handler errored. Sibling subscribers in the
    /// same publish still received the event.
    pub fn dispatch(&self, event: &HostEvent) {
        for (name, error) in self.inner.bus.publish(event) {
            self.fail(&name, format!("event handler error: {error:#}"));
        }
    }

    /// Snapshot of plugins currently in `Running` state, in load order.
    pub fn running_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        let states = self.inner.states.read().expect("state lock poisoned");
        self.inner
            .plugins
            .read()
            .expect("plugin lock poisoned")
            .iter()
            .filter(|p| states.get(p.name()) == Some(&PluginState::Running))
            .cloned()
            .collect()
    }

    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.inner
            .states
            .read()
            .expect("state lock poisoned")
            .get(name)
            .copied()
    }

    /// Recorded cause of a plugin's failure, if it has failed.
    pub fn failure(&self, name: &str) -> Option<FailureRecord> {
        self.inner
            .failures
            .read()
            .expect("failure lock poisoned")
            .get(name)
            .cloned()
    }
}

impl ManagerInner {
    fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .read()
            .expect("plugin lock poisoned")
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// The single transition dispatch point for every plugin.
    ///
    /// Validates the edge against the state machine, writes the new state,
    /// and applies the bus side effects: entering `Running` registers the
    /// plugin's bindings; leaving `Running` unregisters them. Returns
    /// whether the transition was applied.
    fn apply_transition(
        &self,
        name: &str,
        to: PluginState,
        cause: Option<(FailureKind, String)>,
    ) -> bool {
        let _guard = self.transition_lock.lock().expect("transition lock poisoned");

        let from = {
            let states = self.states.read().expect("state lock poisoned");
            match states.get(name) {
                Some(state) => *state,
                None => {
                    warn!(plugin = name, "Transition requested for unknown plugin");
                    return false;
                }
            }
        };

        if !from.can_transition_to(to) {
            debug!(plugin = name, %from, %to, "Ignoring illegal transition");
            return false;
        }

        self.states
            .write()
            .expect("state lock poisoned")
            .insert(name.to_string(), to);

        match (from, to) {
            (_, PluginState::Running) => {
                if let Some(plugin) = self.plugin(name) {
                    self.bus.register(plugin);
                }
                debug!(plugin = name, "Plugin is now running");
            }
            (PluginState::Running, PluginState::Stopping) => {
                debug!(plugin = name, "Plugin is stopping");
                self.bus.unregister(name);
            }
            (PluginState::Running, PluginState::Failed) => {
                self.bus.unregister(name);
            }
            _ => {}
        }

        if to == PluginState::Failed {
            let (kind, cause_text) = cause
                .clone()
                .unwrap_or((FailureKind::Runtime, "unknown failure".to_string()));
            warn!(plugin = name, kind = %kind, cause = %cause_text, "Plugin has failed");
            self.failures.write().expect("failure lock poisoned").insert(
                name.to_string(),
                FailureRecord {
                    kind,
                    cause: cause_text,
                    at: Utc::now(),
                },
            );
        } else if to == PluginState::Terminated {
            info!(plugin = name, "Plugin terminated");
        }

        let _ = self.notices.send(Transition {
            plugin: name.to_string(),
            from,
            to,
            cause: cause.map(|(_, message)| message),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use lodestone_core::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::{timeout, Instant};

    struct TestPlugin {
        name: String,
        start_delay: Duration,
        fail_start: bool,
        fail_handler: bool,
        kinds: Vec<EventKind>,
        events_seen: AtomicUsize,
    }

    impl TestPlugin {
        fn factory(name: &str) -> PluginFactory {
            Self::factory_with(name, Duration::ZERO, false, false, vec![])
        }

        fn factory_with(
            name: &str,
            start_delay: Duration,
            fail_start: bool,
            fail_handler: bool,
            kinds: Vec<EventKind>,
        ) -> PluginFactory {
            let name = name.to_string();
            PluginFactory::new(move |_ctx: &PluginContext| -> Arc<dyn Plugin> {
                Arc::new(TestPlugin {
                    name: name.clone(),
                    start_delay,
                    fail_start,
                    fail_handler,
                    kinds: kinds.clone(),
                    events_seen: AtomicUsize::new(0),
                })
            })
        }
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn subscriptions(&self) -> Vec<EventKind> {
            self.kinds.clone()
        }

        async fn start_up(&self) -> Result<()> {
            if !self.start_delay.is_zero() {
                tokio::time::sleep(self.start_delay).await;
            }
            if self.fail_start {
                return Err(anyhow!("refusing to start"));
            }
            Ok(())
        }

        async fn shut_down(&self) -> Result<()> {
            Ok(())
        }

        fn on_event(&self, _event: &HostEvent) -> Result<()> {
            self.events_seen.fetch_add(1, Ordering::SeqCst);
            if self.fail_handler {
                return Err(anyhow!("handler exploded"));
            }
            Ok(())
        }
    }

    fn manager() -> PluginManager {
        PluginManager::new(
            Arc::new(EventBus::new()),
            Arc::new(ConfigStore::new("unused.properties")),
        )
    }

    async fn join_all(handles: Vec<JoinHandle<()>>) {
        for handle in handles {
            timeout(Duration::from_secs(5), handle)
                .await
                .expect("task timed out")
                .expect("task panicked");
        }
    }

    #[tokio::test]
    async fn test_plugins_start_concurrently() {
        let manager = manager();
        let factories = (0..5)
            .map(|i| {
                TestPlugin::factory_with(
                    &format!("p{i}"),
                    Duration::from_millis(50),
                    false,
                    false,
                    vec![],
                )
            })
            .collect();

        let started = Instant::now();
        let handles = manager.load_all(factories, false);
        join_all(handles).await;
        let elapsed = started.elapsed();

        // bounded by the slowest plugin, not the sum of all five
        assert!(
            elapsed < Duration::from_millis(150),
            "start-up took {elapsed:?}, expected ~50ms"
        );
        assert_eq!(manager.running_plugins().len(), 5);
    }

    #[tokio::test]
    async fn test_failing_startup_is_isolated() {
        let manager = manager();
        let factories = vec![
            TestPlugin::factory("ok-1"),
            TestPlugin::factory_with("broken", Duration::ZERO, true, false, vec![]),
            TestPlugin::factory("ok-2"),
        ];

        join_all(manager.load_all(factories, false)).await;

        assert_eq!(manager.running_plugins().len(), 2);
        assert_eq!(manager.state("broken"), Some(PluginState::Failed));
        assert_eq!(manager.state("ok-1"), Some(PluginState::Running));
        let failure = manager.failure("broken").unwrap();
        assert_eq!(failure.kind, FailureKind::Startup);
        assert!(failure.cause.contains("refusing to start"));
        assert!(!manager.bus().is_registered("broken"));
    }

    #[tokio::test]
    async fn test_subscriber_iff_running() {
        let manager = manager();
        let factories = vec![
            TestPlugin::factory_with("a", Duration::ZERO, false, false, vec![EventKind::Tick]),
            TestPlugin::factory_with("b", Duration::ZERO, false, false, vec![EventKind::Tick]),
        ];
        join_all(manager.load_all(factories, false)).await;

        assert!(manager.bus().is_registered("a"));
        assert!(manager.bus().is_registered("b"));

        let stop = manager.stop("a").expect("a was running");
        timeout(Duration::from_secs(5), stop).await.unwrap().unwrap();

        assert_eq!(manager.state("a"), Some(PluginState::Terminated));
        assert!(!manager.bus().is_registered("a"));
        assert!(manager.bus().is_registered("b"));
        assert_eq!(manager.running_plugins().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_non_running_is_noop() {
        let manager = manager();
        join_all(manager.load_all(vec![TestPlugin::factory("p")], false)).await;

        let stop = manager.stop("p").unwrap();
        timeout(Duration::from_secs(5), stop).await.unwrap().unwrap();

        assert!(manager.stop("p").is_none());
        assert!(manager.stop("no-such-plugin").is_none());
        assert_eq!(manager.state("p"), Some(PluginState::Terminated));
    }

    #[tokio::test]
    async fn test_handler_error_fails_plugin_but_not_siblings() {
        let manager = manager();
        let factories = vec![
            TestPlugin::factory_with("healthy", Duration::ZERO, false, false, vec![EventKind::Tick]),
            TestPlugin::factory_with("faulty", Duration::ZERO, false, true, vec![EventKind::Tick]),
        ];
        join_all(manager.load_all(factories, false)).await;

        manager.dispatch(&HostEvent::Tick { seq: 1 });

        assert_eq!(manager.state("faulty"), Some(PluginState::Failed));
        assert!(!manager.bus().is_registered("faulty"));
        let failure = manager.failure("faulty").unwrap();
        assert_eq!(failure.kind, FailureKind::Runtime);
        assert!(failure.cause.contains("handler exploded"));
        assert!(manager.bus().is_registered("healthy"));

        // the failed plugin is out of the subscriber set for later publishes
        manager.dispatch(&HostEvent::Tick { seq: 2 });
        assert_eq!(manager.running_plugins().len(), 1);
        assert_eq!(manager.bus().subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_developer_plugins_gated() {
        let manager = manager();
        let factories = vec![
            TestPlugin::factory("normal"),
            PluginFactory::developer(|_ctx: &PluginContext| -> Arc<dyn Plugin> {
                Arc::new(TestPlugin {
                    name: "dev-only".into(),
                    start_delay: Duration::ZERO,
                    fail_start: false,
                    fail_handler: false,
                    kinds: vec![],
                    events_seen: AtomicUsize::new(0),
                })
            }),
        ];
        join_all(manager.load_all(factories, false)).await;

        assert_eq!(manager.state("dev-only"), None);
        assert_eq!(manager.running_plugins().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_plugin_names_skipped() {
        let manager = manager();
        let factories = vec![TestPlugin::factory("dup"), TestPlugin::factory("dup")];
        join_all(manager.load_all(factories, false)).await;
        assert_eq!(manager.running_plugins().len(), 1);
        assert_eq!(manager.bus().subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_transition_notices_in_order() {
        let manager = manager();
        let mut notices = manager.subscribe_transitions();

        join_all(manager.load_all(vec![TestPlugin::factory("p")], false)).await;

        let first = timeout(Duration::from_secs(5), notices.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.from, PluginState::Idle);
        assert_eq!(first.to, PluginState::Starting);

        let second = timeout(Duration::from_secs(5), notices.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.from, PluginState::Starting);
        assert_eq!(second.to, PluginState::Running);
    }
}
