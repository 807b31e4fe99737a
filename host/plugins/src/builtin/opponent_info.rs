//! Opponent info plugin: tracks the current interaction target so an
//! overlay layer can poll it.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use lodestone_config::{ConfigError, ConfigSchema, ConfigStore, ConfigValue, TypedConfig};
use lodestone_core::{EventKind, HostEvent};

use crate::sdk::{Plugin, PluginContext};

pub fn schema() -> ConfigSchema {
    ConfigSchema::new(
        "oppinfo",
        "Opponent Info",
        "Configuration for the opponent info plugin",
    )
    .item(
        "enabled",
        "Enabled",
        "Configures whether or not opponent info is displayed",
        ConfigValue::Bool(true),
    )
}

/// Typed accessors for the opponent info settings.
pub struct OpponentInfoConfig {
    view: TypedConfig,
}

impl OpponentInfoConfig {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        let view = TypedConfig::new(schema(), store).expect("opponent info schema is valid");
        Self { view }
    }

    pub fn enabled(&self) -> Result<bool, ConfigError> {
        self.view.bool_value("enabled")
    }
}

pub struct OpponentInfo {
    config: OpponentInfoConfig,
    opponent: Mutex<Option<String>>,
}

impl OpponentInfo {
    pub fn new(ctx: &PluginContext) -> Self {
        Self {
            config: OpponentInfoConfig::new(ctx.store.clone()),
            opponent: Mutex::new(None),
        }
    }

    /// Current opponent name, polled by the overlay layer.
    pub fn current_opponent(&self) -> Option<String> {
        self.opponent.lock().expect("opponent lock poisoned").clone()
    }
}

#[async_trait]
impl Plugin for OpponentInfo {
    fn name(&self) -> &str {
        "opponent-info"
    }

    fn config_schema(&self) -> Option<ConfigSchema> {
        Some(schema())
    }

    fn subscriptions(&self) -> Vec<EventKind> {
        vec![EventKind::TargetChanged, EventKind::SessionEnded]
    }

    async fn start_up(&self) -> Result<()> {
        Ok(())
    }

    async fn shut_down(&self) -> Result<()> {
        *self.opponent.lock().expect("opponent lock poisoned") = None;
        Ok(())
    }

    fn on_event(&self, event: &HostEvent) -> Result<()> {
        match event {
            HostEvent::TargetChanged { target } => {
                if !self.config.enabled()? {
                    return Ok(());
                }
                debug!(target = ?target, "Opponent changed");
                *self.opponent.lock().expect("opponent lock poisoned") = target.clone();
            }
            HostEvent::SessionEnded => {
                *self.opponent.lock().expect("opponent lock poisoned") = None;
            }
            _ => {}
        }
        Ok(())
    }
}
