//! Idle alert plugin: raises a notification once the local actor has been
//! idle for a configurable number of host ticks.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use lodestone_config::{ConfigError, ConfigSchema, ConfigStore, ConfigValue, TypedConfig};
use lodestone_core::{EventKind, HostEvent};

use crate::sdk::{Plugin, PluginContext};

pub fn schema() -> ConfigSchema {
    ConfigSchema::new("idlealert", "Idle Alert", "Configuration for the idle alert plugin")
        .item(
            "enabled",
            "Enabled",
            "Configures whether idle alerts are raised",
            ConfigValue::Bool(true),
        )
        .item(
            "idleTicks",
            "Idle ticks",
            "Consecutive idle ticks before the alert fires",
            ConfigValue::Int(4),
        )
}

/// Typed accessors for the idle alert settings.
pub struct IdleAlertConfig {
    view: TypedConfig,
}

impl IdleAlertConfig {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        let view = TypedConfig::new(schema(), store).expect("idle alert schema is valid");
        Self { view }
    }

    pub fn enabled(&self) -> Result<bool, ConfigError> {
        self.view.bool_value("enabled")
    }

    pub fn idle_ticks(&self) -> Result<i64, ConfigError> {
        self.view.int_value("idleTicks")
    }
}

#[derive(Default)]
struct IdleTracker {
    idle: bool,
    idle_ticks: i64,
    alerted: bool,
}

pub struct IdleAlert {
    config: IdleAlertConfig,
    tracker: Mutex<IdleTracker>,
}

impl IdleAlert {
    pub fn new(ctx: &PluginContext) -> Self {
        Self {
            config: IdleAlertConfig::new(ctx.store.clone()),
            tracker: Mutex::new(IdleTracker::default()),
        }
    }

    /// Whether the alert has fired for the current idle stretch.
    pub fn alerted(&self) -> bool {
        self.tracker.lock().expect("tracker lock poisoned").alerted
    }
}

#[async_trait]
impl Plugin for IdleAlert {
    fn name(&self) -> &str {
        "idle-alert"
    }

    fn config_schema(&self) -> Option<ConfigSchema> {
        Some(schema())
    }

    fn subscriptions(&self) -> Vec<EventKind> {
        vec![EventKind::ActivityChanged, EventKind::Tick]
    }

    async fn start_up(&self) -> Result<()> {
        *self.tracker.lock().expect("tracker lock poisoned") = IdleTracker::default();
        Ok(())
    }

    async fn shut_down(&self) -> Result<()> {
        Ok(())
    }

    fn on_event(&self, event: &HostEvent) -> Result<()> {
        match event {
            HostEvent::ActivityChanged { active } => {
                let mut tracker = self.tracker.lock().expect("tracker lock poisoned");
                tracker.idle = !active;
                tracker.idle_ticks = 0;
                tracker.alerted = false;
            }
            HostEvent::Tick { .. } => {
                let mut tracker = self.tracker.lock().expect("tracker lock poisoned");
                if !tracker.idle || tracker.alerted {
                    return Ok(());
                }
                tracker.idle_ticks += 1;
                if tracker.idle_ticks >= self.config.idle_ticks()? && self.config.enabled()? {
                    info!("You are now idle");
                    tracker.alerted = true;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
