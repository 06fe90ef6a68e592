//! VIP package types

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Purchasable VIP packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Package {
    /// 1 day - Rp2.000
    #[serde(rename = "vip_1d")]
    OneDay,
    /// 3 days - Rp4.000
    #[serde(rename = "vip_3d")]
    ThreeDays,
    /// 7 days - Rp9.000
    #[serde(rename = "vip_7d")]
    SevenDays,
    /// 30 days - Rp25.000
    #[serde(rename = "vip_30d")]
    ThirtyDays,
}

impl Package {
    /// All packages, cheapest first
    pub const ALL: [Package; 4] = [
        Self::OneDay,
        Self::ThreeDays,
        Self::SevenDays,
        Self::ThirtyDays,
    ];

    /// Package identifier as used in callbacks and the API
    pub const fn id(&self) -> &'static str {
        match self {
            Self::OneDay => "vip_1d",
            Self::ThreeDays => "vip_3d",
            Self::SevenDays => "vip_7d",
            Self::ThirtyDays => "vip_30d",
        }
    }

    /// Nominal VIP duration granted by this package
    pub const fn days(&self) -> u32 {
        match self {
            Self::OneDay => 1,
            Self::ThreeDays => 3,
            Self::SevenDays => 7,
            Self::ThirtyDays => 30,
        }
    }

    /// Price in rupiah
    pub const fn price(&self) -> u64 {
        match self {
            Self::OneDay => 2_000,
            Self::ThreeDays => 4_000,
            Self::SevenDays => 9_000,
            Self::ThirtyDays => 25_000,
        }
    }

    /// Human readable label for menus
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OneDay => "VIP 1 Hari",
            Self::ThreeDays => "VIP 3 Hari",
            Self::SevenDays => "VIP 7 Hari",
            Self::ThirtyDays => "VIP 30 Hari",
        }
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for Package {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vip_1d" => Ok(Self::OneDay),
            "vip_3d" => Ok(Self::ThreeDays),
            "vip_7d" => Ok(Self::SevenDays),
            "vip_30d" => Ok(Self::ThirtyDays),
            _ => Err(ParseError::UnknownPackage(s.to_string())),
        }
    }
}
