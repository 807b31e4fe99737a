//! Diagnostics plugin (developer mode only): counts event deliveries per
//! kind for inspection while developing other plugins.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use lodestone_core::{EventKind, HostEvent};

use crate::sdk::Plugin;

pub struct Diagnostics {
    counts: Mutex<HashMap<EventKind, u64>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn event_count(&self, kind: EventKind) -> u64 {
        self.counts
            .lock()
            .expect("count lock poisoned")
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for Diagnostics {
    fn name(&self) -> &str {
        "diagnostics"
    }

    fn subscriptions(&self) -> Vec<EventKind> {
        vec![
            EventKind::SessionStarted,
            EventKind::SessionEnded,
            EventKind::Tick,
            EventKind::ActivityChanged,
            EventKind::TargetChanged,
        ]
    }

    async fn start_up(&self) -> Result<()> {
        debug!("Diagnostics plugin collecting event counts");
        Ok(())
    }

    async fn shut_down(&self) -> Result<()> {
        Ok(())
    }

    fn on_event(&self, event: &HostEvent) -> Result<()> {
        let kind = event.kind();
        let mut counts = self.counts.lock().expect("count lock poisoned");
        *counts.entry(kind).or_insert(0) += 1;
        debug!(kind = %kind, "Observed event");
        Ok(())
    }
}
