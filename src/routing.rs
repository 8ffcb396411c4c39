//! Dead-letter destination resolution.
//!
//! Policy, in precedence order: an explicit override topic wins
//! unconditionally; otherwise the `.dlq` suffix is appended when suffixing is
//! enabled; otherwise the original topic is reused unchanged (degenerate but
//! legal). Resolution is a pure function of the configuration and input.

/// Suffix appended to the original topic when no override is configured.
pub const DLQ_SUFFIX: &str = ".dlq";

/// Dead-letter routing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlqRouting {
    override_topic: Option<String>,
    append_suffix: bool,
}

impl DlqRouting {
    pub fn new(override_topic: Option<String>, append_suffix: bool) -> Self {
        Self { override_topic, append_suffix }
    }

    /// Route every exhausted message to one fixed topic.
    pub fn fixed(topic: impl Into<String>) -> Self {
        Self::new(Some(topic.into()), false)
    }

    /// Append [`DLQ_SUFFIX`] to the original topic.
    pub fn suffixing() -> Self {
        Self::new(None, true)
    }

    /// Reuse the original topic unchanged.
    pub fn passthrough() -> Self {
        Self::new(None, false)
    }

    /// Resolve the dead-letter destination for an original topic.
    pub fn resolve(&self, original_topic: &str) -> String {
        match &self.override_topic {
            Some(topic) if !topic.trim().is_empty() => topic.clone(),
            _ if self.append_suffix => format!("{original_topic}{DLQ_SUFFIX}"),
            _ => original_topic.to_string(),
        }
    }
}

impl Default for DlqRouting {
    fn default() -> Self {
        Self::suffixing()
    }
}
