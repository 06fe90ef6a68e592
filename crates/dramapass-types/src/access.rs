//! Content access outcomes

use serde::{Deserialize, Serialize};

/// Why a content request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessDenial {
    /// The item is VIP-only and the subscriber has no active window
    VipRequired,
    /// No free views left for today
    QuotaExhausted,
}

impl AccessDenial {
    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::VipRequired => "VIP_REQUIRED",
            Self::QuotaExhausted => "QUOTA_EXHAUSTED",
        }
    }

    /// Message shown to the subscriber
    pub const fn message(&self) -> &'static str {
        match self {
            Self::VipRequired => "This part is for VIP members only. Upgrade to VIP to watch it.",
            Self::QuotaExhausted => {
                "Your free views for today are used up. Come back tomorrow or upgrade to VIP."
            }
        }
    }
}

impl std::fmt::Display for AccessDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_matches_code() {
        for denial in [AccessDenial::VipRequired, AccessDenial::QuotaExhausted] {
            let json = serde_json::to_string(&denial).unwrap();
            assert_eq!(json, format!("\"{}\"", denial.code()));
        }
    }
}
