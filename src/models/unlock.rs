//! Unlock request/response DTOs

use serde::{Deserialize, Serialize};

/// Caller-supplied unlock request.
///
/// camelCase is the primary wire form; snake_case is accepted as an alias
/// on every field. Exactly one of `device_ip` / `device_id` selects the
/// resolution path.
#[derive(Debug, Clone, Deserialize)]
pub struct UnlockRequest {
    #[serde(default, rename = "deviceIp", alias = "device_ip")]
    pub device_ip: Option<String>,
    #[serde(default, rename = "deviceId", alias = "device_id")]
    pub device_id: Option<String>,
    #[serde(default, rename = "policyId", alias = "policy_id")]
    pub policy_id: Option<String>,
    #[serde(default, rename = "orgId", alias = "org_id")]
    pub org_id: Option<String>,
    #[serde(default, rename = "supportUser", alias = "support_user")]
    pub support_user: Option<String>,
}

impl UnlockRequest {
    /// 去除首尾空白后的 deviceIp，空串视为缺失
    pub fn device_ip(&self) -> Option<&str> {
        non_empty(self.device_ip.as_deref())
    }

    /// 去除首尾空白后的 deviceId，空串视为缺失
    pub fn device_id(&self) -> Option<&str> {
        non_empty(self.device_id.as_deref())
    }

    pub fn policy_id(&self) -> Option<&str> {
        non_empty(self.policy_id.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// 统一响应结构
#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub message: String,
}
