//! 设备解析器
//! 按 IP 扫描分页的设备清单，返回第一个匹配记录

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::device::DeviceRecord;
use crate::services::signage_client::SignageClient;

/// 固定每页记录数
pub const PAGE_SIZE: usize = 100;

/// 清单页中可能承载记录数组的字段，按顺序尝试
const ITEM_KEYS: [&str; 3] = ["items", "data", "devices"];

/// 设备解析器
pub struct DeviceResolver {
    client: Arc<SignageClient>,
    /// 分页扫描的页数上限，防御永不缩页的上游
    max_pages: usize,
}

impl DeviceResolver {
    pub fn new(client: Arc<SignageClient>, max_pages: usize) -> Self {
        Self { client, max_pages }
    }

    /// 把网络地址映射为设备记录
    ///
    /// 逐页拉取清单，返回页序、页内记录序上第一个宣告了目标 IP 的记录。
    /// 短页或空页表示最后一页，扫描结束；任何客户端错误立即中止并丢弃
    /// 已有进度。
    pub async fn resolve(&self, target_ip: &str) -> Result<Option<DeviceRecord>, AppError> {
        let target = target_ip.trim();

        for page in 0..self.max_pages {
            let offset = (page * PAGE_SIZE) as u64;
            let payload = self.client.list_devices(offset, PAGE_SIZE as u64).await?;

            let items = extract_items(&payload);
            if items.is_empty() {
                debug!(page, "Inventory page empty, stopping scan");
                return Ok(None);
            }

            for item in items {
                if let Some(record) = DeviceRecord::from_value(item) {
                    if record.matches_ip(target) {
                        debug!(page, device_id = ?record.identifier(), "Device matched by IP");
                        return Ok(Some(record));
                    }
                }
            }

            // 短页意味着最后一页
            if items.len() < PAGE_SIZE {
                return Ok(None);
            }
        }

        warn!(
            max_pages = self.max_pages,
            target_ip = target,
            "Inventory scan hit the page cap without a short page; treating as not found"
        );
        Ok(None)
    }
}

/// 从一页清单载荷中取出记录数组
///
/// 载荷可能是裸数组，也可能是把数组挂在约定字段下的对象；每种形态都要
/// 尝试过之后才能断定这一页为空。
pub(crate) fn extract_items(payload: &Value) -> &[Value] {
    if let Some(items) = payload.as_array() {
        return items;
    }

    if let Some(object) = payload.as_object() {
        for key in ITEM_KEYS {
            if let Some(items) = object.get(key).and_then(Value::as_array) {
                if !items.is_empty() {
                    return items;
                }
            }
        }
    }

    &[]
}
