//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{handlers, middleware::AppState};

/// 解锁请求体大小上限（64 KiB，足够容纳任何合法请求）
const UNLOCK_BODY_LIMIT: usize = 64 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new().route("/health", get(handlers::health::health_check));

    // 解锁端点：/unlock 与原工具的挂载路径 /api/signageos/unlock 等价
    let unlock_routes = Router::new()
        .route("/unlock", post(handlers::unlock::unlock))
        .route("/api/signageos/unlock", post(handlers::unlock::unlock))
        .layer(RequestBodyLimitLayer::new(UNLOCK_BODY_LIMIT));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(unlock_routes)
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        .with_state(state)
}
