//! Service and data type descriptors.
//!
//! Defines every remote service and every cacheable endpoint. The set of
//! data types is fixed at compile time; consumers refer to them by key
//! (`"<service>:<endpoint>"`).

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

// =============================================================================
// Service Enum
// =============================================================================

/// Remote services that expose account-scoped data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Genshin,
    StarRail,
    Zzz,
}

impl Service {
    /// All services in display order.
    pub const ALL: &'static [Self] = &[Self::Genshin, Self::StarRail, Self::Zzz];

    /// Identifier used in data type keys and config files.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Genshin => "genshin",
            Self::StarRail => "starrail",
            Self::Zzz => "zzz",
        }
    }

    /// Display name for human output.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Genshin => "Genshin Impact",
            Self::StarRail => "Honkai: Star Rail",
            Self::Zzz => "Zenless Zone Zero",
        }
    }

    /// Parse from identifier (case-insensitive).
    pub fn from_id(id: &str) -> Result<Self> {
        let lower = id.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|s| s.id() == lower)
            .copied()
            .ok_or_else(|| SyncError::InvalidService(id.to_string()))
    }

    /// Data types served by this service.
    pub fn data_types(self) -> impl Iterator<Item = DataType> {
        DataType::ALL
            .iter()
            .copied()
            .filter(move |dt| dt.service() == self)
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

// =============================================================================
// Data Types
// =============================================================================

/// A cacheable endpoint of one service.
///
/// This is the unit of caching and subscription granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DataType {
    GenshinDailyNote,
    GenshinSpiralAbyss,
    GenshinTheater,
    StarRailDailyNote,
    StarRailForgottenHall,
    StarRailPureFiction,
    ZzzDailyNote,
    ZzzShiyuDefense,
}

impl DataType {
    pub const ALL: &'static [Self] = &[
        Self::GenshinDailyNote,
        Self::GenshinSpiralAbyss,
        Self::GenshinTheater,
        Self::StarRailDailyNote,
        Self::StarRailForgottenHall,
        Self::StarRailPureFiction,
        Self::ZzzDailyNote,
        Self::ZzzShiyuDefense,
    ];

    /// Service that owns this endpoint.
    #[must_use]
    pub const fn service(self) -> Service {
        match self {
            Self::GenshinDailyNote | Self::GenshinSpiralAbyss | Self::GenshinTheater => {
                Service::Genshin
            }
            Self::StarRailDailyNote | Self::StarRailForgottenHall | Self::StarRailPureFiction => {
                Service::StarRail
            }
            Self::ZzzDailyNote | Self::ZzzShiyuDefense => Service::Zzz,
        }
    }

    /// Endpoint name, unique within the service.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::GenshinDailyNote | Self::StarRailDailyNote | Self::ZzzDailyNote => "daily-note",
            Self::GenshinSpiralAbyss => "spiral-abyss",
            Self::GenshinTheater => "imaginarium-theater",
            Self::StarRailForgottenHall => "forgotten-hall",
            Self::StarRailPureFiction => "pure-fiction",
            Self::ZzzShiyuDefense => "shiyu-defense",
        }
    }

    /// Composite key, e.g. `genshin:daily-note`.
    #[must_use]
    pub fn key(self) -> String {
        format!("{}:{}", self.service().id(), self.endpoint())
    }

    /// Parse a composite key.
    pub fn from_key(key: &str) -> Result<Self> {
        let (service, endpoint) = key
            .trim()
            .split_once(':')
            .ok_or_else(|| SyncError::InvalidDataType(key.to_string()))?;
        let service =
            Service::from_id(service).map_err(|_| SyncError::InvalidDataType(key.to_string()))?;
        service
            .data_types()
            .find(|dt| dt.endpoint() == endpoint)
            .ok_or_else(|| SyncError::InvalidDataType(key.to_string()))
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.service().id(), self.endpoint())
    }
}

impl From<DataType> for String {
    fn from(dt: DataType) -> Self {
        dt.key()
    }
}

impl TryFrom<String> for DataType {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_key(&value)
    }
}

impl std::str::FromStr for DataType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key(s)
    }
}
