//! Built-in plugin roster.

use std::sync::Arc;

use crate::sdk::{Plugin, PluginContext, PluginFactory};

pub mod diagnostics;
pub mod idle_alert;
pub mod opponent_info;

pub use diagnostics::Diagnostics;
pub use idle_alert::IdleAlert;
pub use opponent_info::OpponentInfo;

/// Factories for every built-in plugin, in load order. The diagnostics
/// plugin is developer-only.
pub fn plugin_factories() -> Vec<PluginFactory> {
    vec![
        PluginFactory::new(|ctx: &PluginContext| -> Arc<dyn Plugin> {
            Arc::new(OpponentInfo::new(ctx))
        }),
        PluginFactory::new(|ctx: &PluginContext| -> Arc<dyn Plugin> {
            Arc::new(IdleAlert::new(ctx))
        }),
        PluginFactory::developer(|_ctx: &PluginContext| -> Arc<dyn Plugin> {
            Arc::new(Diagnostics::new())
        }),
    ]
}
