//! Audit trail and log setup.
//!
//! Every intent that reaches a [`TmContext`](crate::context::TmContext)
//! leaves exactly one [`AuditRecord`] on the `audit` tracing target, emitted
//! with [`audit_log!`](crate::audit_log). Successful intents log at info,
//! failed and denied ones at warn. The JSON form of the record travels in the
//! `audit_json` field so collectors do not have to re-parse the message.
//!
//! Operational messages use the source-tagged [`debug_log!`](crate::debug_log),
//! [`info_log!`](crate::info_log), [`warn_log!`](crate::warn_log) and
//! [`error_log!`](crate::error_log) macros.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Hierarchy intents that are audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ProfileCreate,
    ProfileDelete,
    NodeAdd,
    NodeDelete,
    ShaperUpdate,
    HierarchyStart,
    HierarchyStop,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProfileCreate => "profile_create",
            Self::ProfileDelete => "profile_delete",
            Self::NodeAdd => "node_add",
            Self::NodeDelete => "node_delete",
            Self::ShaperUpdate => "shaper_update",
            Self::HierarchyStart => "hierarchy_start",
            Self::HierarchyStop => "hierarchy_stop",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object an intent acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AuditObject {
    Node(u32),
    ShaperProfile(u32),
    /// The whole hierarchy of the device.
    Hierarchy,
}

impl fmt::Display for AuditObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node {}", id),
            Self::ShaperProfile(id) => write!(f, "shaper profile {}", id),
            Self::Hierarchy => f.write_str("hierarchy"),
        }
    }
}

/// How an intent ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
    /// Refused by the activation state before the device was called.
    Denied,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Denied => "denied",
        })
    }
}

/// One audited intent.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    /// Device the hierarchy belongs to
    pub device: String,
    pub action: AuditAction,
    pub object: AuditObject,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Error text for failed and denied intents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditRecord {
    /// Starts a successful record; use [`failed`](Self::failed) or
    /// [`denied`](Self::denied) to change the outcome.
    pub fn new(device: impl Into<String>, action: AuditAction, object: AuditObject) -> Self {
        Self {
            timestamp: Utc::now(),
            device: device.into(),
            action,
            object,
            outcome: AuditOutcome::Success,
            details: None,
            reason: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.outcome = AuditOutcome::Failure;
        self.reason = Some(reason.into());
        self
    }

    pub fn denied(mut self, reason: impl Into<String>) -> Self {
        self.outcome = AuditOutcome::Denied;
        self.reason = Some(reason.into());
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"device":"{}","action":"{}","serialization_error":"{}"}}"#,
                self.device, self.action, e
            )
        })
    }

    /// Writes the record to the `audit` target.
    pub fn emit(&self) {
        let json = self.to_json();
        match self.outcome {
            AuditOutcome::Success => tracing::info!(
                target: "audit",
                device = %self.device,
                action = %self.action,
                object = %self.object,
                audit_json = %json,
                "AUDIT: {} {} on {}",
                self.action,
                self.outcome,
                self.object
            ),
            AuditOutcome::Failure | AuditOutcome::Denied => tracing::warn!(
                target: "audit",
                device = %self.device,
                action = %self.action,
                object = %self.object,
                reason = self.reason.as_deref().unwrap_or(""),
                audit_json = %json,
                "AUDIT: {} {} on {}",
                self.action,
                self.outcome,
                self.object
            ),
        }
    }
}

/// Emits an [`AuditRecord`].
///
/// ```ignore
/// audit_log!(AuditRecord::new("Ethernet0", AuditAction::NodeAdd, AuditObject::Node(3)));
/// ```
#[macro_export]
macro_rules! audit_log {
    ($record:expr) => {
        $crate::audit::AuditRecord::emit(&$record)
    };
}

/// Debug-level logging tagged with its source.
///
/// ```ignore
/// debug_log!("TmContext", node = 3, "Node added");
/// ```
#[macro_export]
macro_rules! debug_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::debug!(source = $source, $($arg)*)
    };
}

#[macro_export]
macro_rules! info_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::info!(source = $source, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::warn!(source = $source, $($arg)*)
    };
}

#[macro_export]
macro_rules! error_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::error!(source = $source, $($arg)*)
    };
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line human readable output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides `log_level`. Events from the `log` crate, used by the
/// device layer, are forwarded as well.
pub fn init_logging(log_level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(layer.pretty()).init(),
        LogFormat::Json => registry.with(layer.with_thread_ids(true).json()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_record_is_success() {
        let record = AuditRecord::new("Ethernet0", AuditAction::NodeAdd, AuditObject::Node(3));
        assert_eq!(record.outcome, AuditOutcome::Success);
        assert_eq!(record.reason, None);
        assert_eq!(record.object.to_string(), "node 3");
    }

    #[test]
    fn test_failed_and_denied() {
        let failed = AuditRecord::new(
            "Ethernet0",
            AuditAction::ProfileDelete,
            AuditObject::ShaperProfile(2),
        )
        .failed("shaper profile 2 is in use");
        assert_eq!(failed.outcome, AuditOutcome::Failure);
        assert_eq!(failed.reason.as_deref(), Some("shaper profile 2 is in use"));

        let denied = AuditRecord::new("Ethernet0", AuditAction::NodeAdd, AuditObject::Node(1))
            .denied("hierarchy is active");
        assert_eq!(denied.outcome, AuditOutcome::Denied);
    }

    #[test]
    fn test_json_layout() {
        let record = AuditRecord::new(
            "Ethernet0",
            AuditAction::HierarchyStart,
            AuditObject::Hierarchy,
        )
        .with_details(serde_json::json!({ "leaf_count": 4 }));

        let value: serde_json::Value = serde_json::from_str(&record.to_json()).unwrap();
        assert_eq!(value["action"], "hierarchy_start");
        assert_eq!(value["object"]["type"], "hierarchy");
        assert_eq!(value["outcome"], "success");
        assert_eq!(value["details"]["leaf_count"], 4);
        assert!(value.get("reason").is_none());

        let node = serde_json::to_value(AuditObject::Node(7)).unwrap();
        assert_eq!(node, serde_json::json!({ "type": "node", "id": 7 }));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(AuditAction::ShaperUpdate.to_string(), "shaper_update");
    }
}
