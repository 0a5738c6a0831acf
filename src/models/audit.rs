//! Audit domain models

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 审计操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// 成功完成的解锁
    Unlock,
    /// 解锁尝试（任何未成功的终态）
    UnlockAttempt,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Unlock => "unlock",
            AuditAction::UnlockAttempt => "unlock_attempt",
        }
    }
}

impl Serialize for AuditAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Terminal request outcome, written verbatim into the audit trail.
///
/// The wire names form a fixed enumeration that log-consuming tooling
/// depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditStatus {
    #[serde(rename = "BAD_REQUEST")]
    BadRequest,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "NO_DEVICE_ID")]
    NoDeviceId,
    #[serde(rename = "EXCEPTION")]
    Exception,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "SUCCESS")]
    Success,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::BadRequest => "BAD_REQUEST",
            AuditStatus::Error => "ERROR",
            AuditStatus::NotFound => "NOT_FOUND",
            AuditStatus::NoDeviceId => "NO_DEVICE_ID",
            AuditStatus::Exception => "EXCEPTION",
            AuditStatus::Failed => "FAILED",
            AuditStatus::Success => "SUCCESS",
        }
    }
}

/// One immutable record of an attempted or completed unlock operation.
///
/// Serialized as a single JSON line. Optional fields are omitted when the
/// request never produced them; `policy_id` is always present (null when
/// the body was unparseable).
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub policy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub remote_addr: String,
    pub status: AuditStatus,
    pub detail: String,
}
