use serde::{Deserialize, Serialize};

/// A message finished analysis.
///
/// Carries identifiers only; clients fetch the analysis itself over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "message.analysis")]
pub struct AnalysisEvent {
    /// Owning tenant
    pub tenant_id: i64,
    /// Analyzed message
    pub message_id: i64,
    /// Whether the analysis flagged the message as important
    pub is_important: bool,
}

impl AnalysisEvent {
    /// Event for an analyzed message
    #[must_use]
    pub fn new(tenant_id: i64, message_id: i64, is_important: bool) -> Self {
        Self {
            tenant_id,
            message_id,
            is_important,
        }
    }
}
