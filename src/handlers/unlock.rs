//! 解锁 API 处理器

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{error::Result, middleware::{AppState, ClientIp}};

/// 移除设备上的锁定策略
///
/// 请求体以原始字节交给编排服务解析，这样无法解析的请求也会进入审计。
pub async fn unlock(
    State(state): State<Arc<AppState>>,
    ClientIp(remote_addr): ClientIp,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let response = state.unlock_service.unlock(&body, remote_addr).await?;
    Ok(Json(response))
}
