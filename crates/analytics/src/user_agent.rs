//! User-agent classification into device, browser, and OS families.
//!
//! The aggregator only sees the [`UserAgentClassifier`] trait, so the
//! substring heuristics can be swapped for a real parser.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use woothee::parser::Parser;

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

/// Classified user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub device: DeviceType,
    pub browser: &'static str,
    pub os: &'static str,
}

pub trait UserAgentClassifier: Send + Sync {
    fn classify(&self, user_agent: &str) -> DeviceProfile;
}

/// Which classifier the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Heuristic,
    Woothee,
}

impl ClassifierKind {
    pub fn build(self) -> Box<dyn UserAgentClassifier> {
        match self {
            Self::Heuristic => Box::new(HeuristicClassifier),
            Self::Woothee => Box::new(WootheeClassifier::new()),
        }
    }
}

static TABLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tablet|ipad").expect("invalid tablet pattern"));
static MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)mobile|android|iphone").expect("invalid mobile pattern"));

/// Substring rules. Tablet markers win over generic mobile markers; Edge
/// and Opera are checked before Chrome because their agents also say
/// "Chrome"; mobile OSes are checked before macOS/Linux for the same
/// reason.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    fn device(ua: &str) -> DeviceType {
        if TABLET.is_match(ua) {
            DeviceType::Tablet
        } else if MOBILE.is_match(ua) {
            DeviceType::Mobile
        } else {
            DeviceType::Desktop
        }
    }

    // Edge, Opera, Chrome, Firefox, Safari: each later agent string also
    // carries the tokens of the ones after it
    fn browser(ua: &str) -> &'static str {
        if ua.contains("Edg") {
            "Edge"
        } else if ua.contains("OPR") || ua.contains("Opera") {
            "Opera"
        } else if ua.contains("Chrome") {
            "Chrome"
        } else if ua.contains("Firefox") {
            "Firefox"
        } else if ua.contains("Safari") {
            "Safari"
        } else {
            UNKNOWN
        }
    }

    // Windows, Android, iOS, macOS, Linux: Android agents say "Linux" and
    // iOS agents say "like Mac OS X"
    fn os(ua: &str) -> &'static str {
        if ua.contains("Windows") {
            "Windows"
        } else if ua.contains("Android") {
            "Android"
        } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iOS") {
            "iOS"
        } else if ua.contains("Mac OS") {
            "macOS"
        } else if ua.contains("Linux") {
            "Linux"
        } else {
            UNKNOWN
        }
    }
}

impl UserAgentClassifier for HeuristicClassifier {
    fn classify(&self, user_agent: &str) -> DeviceProfile {
        DeviceProfile {
            device: Self::device(user_agent),
            browser: Self::browser(user_agent),
            os: Self::os(user_agent),
        }
    }
}

/// Classifier backed by the woothee parser, mapped onto the same families.
pub struct WootheeClassifier {
    parser: Parser,
}

impl WootheeClassifier {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }
}

impl Default for WootheeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentClassifier for WootheeClassifier {
    fn classify(&self, user_agent: &str) -> DeviceProfile {
        let Some(result) = self.parser.parse(user_agent) else {
            return DeviceProfile {
                device: DeviceType::Desktop,
                browser: UNKNOWN,
                os: UNKNOWN,
            };
        };

        // woothee reports iPad as a smartphone
        let device = if TABLET.is_match(user_agent) {
            DeviceType::Tablet
        } else {
            match result.category {
                "smartphone" | "mobilephone" => DeviceType::Mobile,
                _ => DeviceType::Desktop,
            }
        };

        let browser = match result.name {
            "Chrome" => "Chrome",
            "Firefox" => "Firefox",
            "Safari" => "Safari",
            "Edge" => "Edge",
            "Opera" => "Opera",
            _ => UNKNOWN,
        };

        let os = match result.os {
            os if os.starts_with("Windows") => "Windows",
            "Mac OSX" => "macOS",
            "Android" => "Android",
            "iPhone" | "iPad" | "iPod" => "iOS",
            "Linux" => "Linux",
            _ => UNKNOWN,
        };

        DeviceProfile {
            device,
            browser,
            os,
        }
    }
}
