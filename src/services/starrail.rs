//! Honkai: Star Rail orchestrator.

use crate::core::orchestrator::{Operation, Orchestrator};
use crate::core::service::{DataType, Service};

const OPERATIONS: &[Operation] = &[
    Operation {
        data_type: DataType::StarRailDailyNote,
        path: "/game_record/hkrpg/api/note",
        query: &[],
    },
    Operation {
        data_type: DataType::StarRailForgottenHall,
        path: "/game_record/hkrpg/api/challenge",
        query: &[("schedule_type", "1"), ("need_all", "false")],
    },
    Operation {
        data_type: DataType::StarRailPureFiction,
        path: "/game_record/hkrpg/api/challenge_story",
        query: &[("schedule_type", "1"), ("need_all", "false")],
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct StarRailOrchestrator;

impl Orchestrator for StarRailOrchestrator {
    fn service(&self) -> Service {
        Service::StarRail
    }

    fn operations(&self) -> &'static [Operation] {
        OPERATIONS
    }

    fn server_for(&self, external_id: &str) -> &'static str {
        match external_id.chars().next() {
            Some('6') => "prod_official_usa",
            Some('7') => "prod_official_eur",
            Some('8') => "prod_official_asia",
            Some('9') => "prod_official_cht",
            Some('5') => "prod_qd_cn",
            _ => "prod_gf_cn",
        }
    }
}
