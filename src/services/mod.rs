//! Service-specific orchestrators.
//!
//! Each service has its own submodule declaring its operation table and how
//! a player uid maps to a game server.

pub mod genshin;
pub mod starrail;
pub mod zzz;

use std::sync::Arc;

use crate::core::orchestrator::OrchestratorSet;

pub use genshin::GenshinOrchestrator;
pub use starrail::StarRailOrchestrator;
pub use zzz::ZzzOrchestrator;

/// Orchestrators for every built-in service.
#[must_use]
pub fn default_orchestrators() -> OrchestratorSet {
    OrchestratorSet::new()
        .with(Arc::new(GenshinOrchestrator))
        .with(Arc::new(StarRailOrchestrator))
        .with(Arc::new(ZzzOrchestrator))
}
