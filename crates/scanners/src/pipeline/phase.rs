use serde::{Deserialize, Serialize};
use std::fmt;

/// The six ordered, non-skippable phases of one repository scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    StaticScanners,
    LlmMap,
    LlmRule,
    LlmOpen,
    LlmComposite,
    Postprocess,
}

impl ScanPhase {
    pub const ALL: [ScanPhase; 6] = [
        ScanPhase::StaticScanners,
        ScanPhase::LlmMap,
        ScanPhase::LlmRule,
        ScanPhase::LlmOpen,
        ScanPhase::LlmComposite,
        ScanPhase::Postprocess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticScanners => "static_scanners",
            Self::LlmMap => "llm_map",
            Self::LlmRule => "llm_rule",
            Self::LlmOpen => "llm_open",
            Self::LlmComposite => "llm_composite",
            Self::Postprocess => "postprocess",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_ordered() {
        for window in ScanPhase::ALL.windows(2) {
            assert!(window[0] < window[1]);
        }
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ScanPhase::StaticScanners).unwrap();
        assert_eq!(json, "\"static_scanners\"");
    }
}
