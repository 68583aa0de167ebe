//! Event type enum as the single source of truth for hook event names.

use std::fmt;
use std::str::FromStr;

/// Hook event types the derivations understand.
///
/// The hook log carries other event names too (`Notification`,
/// `SubagentStop`, ...). Those fail to parse and are ignored by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    SessionStart,
    SessionEnd,
    PreCompact,
    UserPromptSubmit,
    Stop,
    PreToolUse,
    PostToolUse,
}

impl EventType {
    /// The event name as written by the hook.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
            Self::PreCompact => "PreCompact",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::Stop => "Stop",
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SessionStart" => Ok(Self::SessionStart),
            "SessionEnd" => Ok(Self::SessionEnd),
            "PreCompact" => Ok(Self::PreCompact),
            "UserPromptSubmit" => Ok(Self::UserPromptSubmit),
            "Stop" => Ok(Self::Stop),
            "PreToolUse" => Ok(Self::PreToolUse),
            "PostToolUse" => Ok(Self::PostToolUse),
            _ => Err(UnknownEventType(s.to_string())),
        }
    }
}

/// Error type for unknown event type strings.
#[derive(Debug, Clone)]
pub struct UnknownEventType(String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_variants() {
        let variants = [
            EventType::SessionStart,
            EventType::SessionEnd,
            EventType::PreCompact,
            EventType::UserPromptSubmit,
            EventType::Stop,
            EventType::PreToolUse,
            EventType::PostToolUse,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed: EventType = s.parse().expect("should parse");
            assert_eq!(parsed, *variant, "roundtrip failed for {variant:?}");
        }
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert!("stop".parse::<EventType>().is_err());
        assert!("sessionstart".parse::<EventType>().is_err());
    }

    #[test]
    fn test_unknown_type_errors() {
        let result: Result<EventType, _> = "SubagentStop".parse();
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "unknown event type: SubagentStop");
    }
}
