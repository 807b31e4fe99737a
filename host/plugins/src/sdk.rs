//! Plugin SDK
//!
//! The capability contract every extension module implements, plus the
//! context and factory types the lifecycle manager consumes.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use lodestone_config::{ConfigSchema, ConfigStore};
use lodestone_core::{EventKind, HostEvent};

/// A unit of extension behavior with a lifecycle and optional configuration.
///
/// Hooks may block on I/O; the manager runs each on its own task. `on_event`
/// is invoked synchronously on the publishing thread for every event whose
/// kind appears in `subscriptions()`, and only while the plugin is running.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable plugin identity, unique across the loaded set.
    fn name(&self) -> &str;

    /// The plugin's declared configuration group, if it exposes settings.
    fn config_schema(&self) -> Option<ConfigSchema> {
        None
    }

    /// Event kinds this plugin wants delivered while running.
    fn subscriptions(&self) -> Vec<EventKind> {
        Vec::new()
    }

    /// Called during `Starting`. An error fails the plugin.
    async fn start_up(&self) -> Result<()>;

    /// Called during `Stopping`. An error fails the plugin.
    async fn shut_down(&self) -> Result<()>;

    /// Handle one delivered event. An error is isolated from sibling
    /// subscribers and takes this plugin out of service.
    fn on_event(&self, _event: &HostEvent) -> Result<()> {
        Ok(())
    }
}

/// Dependencies handed to plugin factories at construction time.
#[derive(Clone)]
pub struct PluginContext {
    pub store: Arc<ConfigStore>,
}

type ConstructFn = Box<dyn Fn(&PluginContext) -> Arc<dyn Plugin> + Send + Sync>;

/// Constructs one plugin instance. Factories flagged `developer_only` are
/// instantiated only when the developer-mode switch is set.
pub struct PluginFactory {
    pub developer_only: bool,
    construct: ConstructFn,
}

impl PluginFactory {
    pub fn new<F>(construct: F) -> Self
    where
        F: Fn(&PluginContext) -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        Self {
            developer_only: false,
            construct: Box::new(construct),
        }
    }

    pub fn developer<F>(construct: F) -> Self
    where
        F: Fn(&PluginContext) -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        Self {
            developer_only: true,
            construct: Box::new(construct),
        }
    }

    pub fn construct(&self, ctx: &PluginContext) -> Arc<dyn Plugin> {
        (self.construct)(ctx)
    }
}
