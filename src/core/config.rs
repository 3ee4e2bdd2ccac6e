use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Tunable knobs for the moderation subsystem.
///
/// Every field has a sensible default so embedders can start with
/// `ModerationConfig::default()` and override selectively, either in code
/// or through `MODERATION_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Maximum characters kept in a queue item content preview.
    pub preview_max_chars: usize,
    /// Maximum characters accepted for report and sanction reasons.
    pub max_reason_chars: usize,
    /// Page size applied when a listing request does not name one.
    pub default_page_size: u32,
    /// Hard cap on requested page sizes.
    pub max_page_size: u32,
    /// Delivery attempts per notification before it is dropped.
    pub notify_max_attempts: u32,
    /// Base backoff between notification attempts, doubled per retry.
    pub notify_backoff_ms: u64,
    /// Whether urgent-priority reports also alert the moderator channel.
    pub alert_moderators_on_urgent: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            preview_max_chars: 200,
            max_reason_chars: 2000,
            default_page_size: 25,
            max_page_size: 100,
            notify_max_attempts: 3,
            notify_backoff_ms: 200,
            alert_moderators_on_urgent: true,
        }
    }
}

impl ModerationConfig {
    /// Builds a config from `MODERATION_*` environment variables, falling
    /// back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Tests pass a closure
    /// over fixed values so they never touch process environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            preview_max_chars: parse_key(&lookup, "MODERATION_PREVIEW_MAX_CHARS", defaults.preview_max_chars),
            max_reason_chars: parse_key(&lookup, "MODERATION_MAX_REASON_CHARS", defaults.max_reason_chars),
            default_page_size: parse_key(&lookup, "MODERATION_DEFAULT_PAGE_SIZE", defaults.default_page_size),
            max_page_size: parse_key(&lookup, "MODERATION_MAX_PAGE_SIZE", defaults.max_page_size),
            notify_max_attempts: parse_key(&lookup, "MODERATION_NOTIFY_MAX_ATTEMPTS", defaults.notify_max_attempts),
            notify_backoff_ms: parse_key(&lookup, "MODERATION_NOTIFY_BACKOFF_MS", defaults.notify_backoff_ms),
            alert_moderators_on_urgent: parse_key(
                &lookup,
                "MODERATION_ALERT_ON_URGENT",
                defaults.alert_moderators_on_urgent,
            ),
        }
    }

    /// Clamps a requested page size into `1..=max_page_size`.
    pub fn clamp_page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}

fn parse_key<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, raw, "ignoring unparsable config value");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ModerationConfig::default();
        assert!(config.preview_max_chars > 0);
        assert!(config.max_page_size >= config.default_page_size);
        assert!(config.notify_max_attempts >= 1);
    }

    #[test]
    fn page_size_is_clamped() {
        let config = ModerationConfig::default();
        assert_eq!(config.clamp_page_size(None), config.default_page_size);
        assert_eq!(config.clamp_page_size(Some(0)), 1);
        assert_eq!(config.clamp_page_size(Some(10_000)), config.max_page_size);
        assert_eq!(config.clamp_page_size(Some(10)), 10);
    }

    #[test]
    fn overrides_apply_and_bad_values_fall_back() {
        let config = ModerationConfig::from_lookup(|key| match key {
            "MODERATION_PREVIEW_MAX_CHARS" => Some(" 64 ".to_string()),
            "MODERATION_NOTIFY_MAX_ATTEMPTS" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert_eq!(config.preview_max_chars, 64);
        assert_eq!(
            config.notify_max_attempts,
            ModerationConfig::default().notify_max_attempts
        );
        assert_eq!(
            config.max_page_size,
            ModerationConfig::default().max_page_size
        );
    }
}
