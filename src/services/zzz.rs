//! Zenless Zone Zero orchestrator.

use crate::core::orchestrator::{Operation, Orchestrator};
use crate::core::service::{DataType, Service};

const OPERATIONS: &[Operation] = &[
    Operation {
        data_type: DataType::ZzzDailyNote,
        path: "/event/game_record_zzz/api/zzz/note",
        query: &[],
    },
    Operation {
        data_type: DataType::ZzzShiyuDefense,
        path: "/event/game_record_zzz/api/zzz/challenge",
        query: &[("schedule_type", "1")],
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ZzzOrchestrator;

impl Orchestrator for ZzzOrchestrator {
    fn service(&self) -> Service {
        Service::Zzz
    }

    fn operations(&self) -> &'static [Operation] {
        OPERATIONS
    }

    // Global uids carry a two-digit region prefix.
    fn server_for(&self, external_id: &str) -> &'static str {
        match external_id.get(..2) {
            Some("10") => "prod_gf_us",
            Some("13") => "prod_gf_jp",
            Some("15") => "prod_gf_eu",
            Some("17") => "prod_gf_sg",
            _ => "prod_gf_cn",
        }
    }
}
