//! Device inventory records
//!
//! The inventory API has no fixed schema; records are opaque JSON objects
//! and consumers read a tolerant subset of well-known keys. The probe
//! lists below are evaluated in a fixed order.

use serde_json::{Map, Value};

/// 设备标识字段，按优先级取第一个可用值
const ID_KEYS: [&str; 4] = ["id", "deviceId", "uid", "uuid"];

/// 顶层 IP 标量字段
const SCALAR_IP_KEYS: [&str; 5] = ["ip", "lastKnownIp", "privateIp", "publicIp", "ipAddress"];

/// 网络接口容器字段（列表或单个对象）
const INTERFACE_KEYS: [&str; 3] = ["networkInterfaces", "interfaces", "network"];

/// 接口对象内的地址字段
const INTERFACE_IP_KEYS: [&str; 4] = ["ip", "address", "ipv4", "ipv6"];

/// 元数据容器字段，其字符串值按包含关系匹配
const METADATA_KEYS: [&str; 3] = ["metadata", "systemInfo", "info"];

/// One inventory entry. Read-only, fetched fresh per resolution call.
#[derive(Debug, Clone)]
pub struct DeviceRecord(Map<String, Value>);

impl DeviceRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// 尝试把一个清单条目解释为设备记录，非对象条目被忽略
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|m| Self(m.clone()))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// 渲染完整记录，用于 NO_DEVICE_ID 审计详情
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// The platform's canonical key for the device.
    ///
    /// Probes `id`, `deviceId`, `uid`, `uuid` in order and stops at the
    /// first non-empty value; numbers are stringified.
    pub fn identifier(&self) -> Option<String> {
        for key in ID_KEYS {
            match self.0.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
        None
    }

    /// All IP-like strings that require an exact match against the target.
    ///
    /// Accumulates every candidate rather than stopping at the first,
    /// since any one of them may carry the advertised address.
    pub fn exact_ip_candidates(&self) -> Vec<String> {
        let mut candidates = Vec::new();

        // 顶层标量字段
        for key in SCALAR_IP_KEYS {
            if let Some(value) = self.0.get(key) {
                push_scalar(&mut candidates, value);
            }
        }

        // 嵌套网络接口：列表或单个对象
        for key in INTERFACE_KEYS {
            match self.0.get(key) {
                Some(Value::Array(entries)) => {
                    for entry in entries {
                        if let Some(obj) = entry.as_object() {
                            push_interface_fields(&mut candidates, obj);
                        }
                    }
                }
                Some(Value::Object(obj)) => {
                    push_interface_fields(&mut candidates, obj);
                }
                _ => {}
            }
        }

        candidates
    }

    /// 元数据对象中是否有字符串值包含目标 IP（软匹配，仅此来源用子串语义）
    pub fn metadata_mentions(&self, target_ip: &str) -> bool {
        for key in METADATA_KEYS {
            if let Some(Value::Object(meta)) = self.0.get(key) {
                for value in meta.values() {
                    if let Value::String(s) = value {
                        if s.contains(target_ip) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    /// 记录是否宣告了目标 IP
    ///
    /// 标量与接口来源要求去除首尾空白后完全相等，元数据来源按子串匹配。
    pub fn matches_ip(&self, target_ip: &str) -> bool {
        if self
            .exact_ip_candidates()
            .iter()
            .any(|candidate| candidate.trim() == target_ip)
        {
            return true;
        }
        self.metadata_mentions(target_ip)
    }
}

fn push_scalar(candidates: &mut Vec<String>, value: &Value) {
    match value {
        Value::String(s) if !s.is_empty() => candidates.push(s.clone()),
        Value::Number(n) => candidates.push(n.to_string()),
        _ => {}
    }
}

fn push_interface_fields(candidates: &mut Vec<String>, entry: &Map<String, Value>) {
    for key in INTERFACE_IP_KEYS {
        if let Some(value) = entry.get(key) {
            push_scalar(candidates, value);
        }
    }
}
