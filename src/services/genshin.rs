//! Genshin Impact orchestrator.
//!
//! Data types: `genshin:daily-note`, `genshin:spiral-abyss`,
//! `genshin:imaginarium-theater`.

use crate::core::orchestrator::{Operation, Orchestrator};
use crate::core::service::{DataType, Service};

const OPERATIONS: &[Operation] = &[
    Operation {
        data_type: DataType::GenshinDailyNote,
        path: "/game_record/genshin/api/dailyNote",
        query: &[],
    },
    Operation {
        data_type: DataType::GenshinSpiralAbyss,
        path: "/game_record/genshin/api/spiralAbyss",
        query: &[("schedule_type", "1")],
    },
    Operation {
        data_type: DataType::GenshinTheater,
        path: "/game_record/genshin/api/role_combat",
        query: &[("need_detail", "false")],
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct GenshinOrchestrator;

impl Orchestrator for GenshinOrchestrator {
    fn service(&self) -> Service {
        Service::Genshin
    }

    fn operations(&self) -> &'static [Operation] {
        OPERATIONS
    }

    fn server_for(&self, external_id: &str) -> &'static str {
        // Ten-digit Asia uids start with 18.
        if external_id.len() == 10 && external_id.starts_with("18") {
            return "os_asia";
        }
        match external_id.chars().next() {
            Some('6') => "os_usa",
            Some('7') => "os_euro",
            Some('8') => "os_asia",
            Some('9') => "os_cht",
            Some('5') => "cn_qd01",
            _ => "cn_gf01",
        }
    }
}
