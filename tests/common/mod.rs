//! 测试公共模块
//! 提供测试配置、进程内 signageOS 替身和审计文件读取工具

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::ServiceExt;

use signage_unlock::{
    config::{AppConfig, AuditConfig, LoggingConfig, ServerConfig, SignageOsConfig},
    middleware::AppState,
    routes,
    services::{AuditService, SignageClient, UnlockService},
};

// ==================== 测试配置 ====================

/// 创建测试配置，上游指向给定地址，审计日志写进临时目录
pub fn create_test_config(api_base: String, audit_dir: &FsPath) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        signageos: SignageOsConfig {
            api_base,
            x_auth: Some(Secret::new("test-token-id:test-token-secret".to_string())),
            api_key: None,
            request_timeout_secs: 5,
            max_pages: 10,
        },
        audit: AuditConfig {
            log_path: audit_dir
                .join("audit.log")
                .to_string_lossy()
                .into_owned(),
            max_bytes: 1024 * 1024,
            backup_count: 3,
        },
    }
}

/// 创建测试应用
pub fn create_test_app(config: AppConfig) -> Router {
    let client = Arc::new(
        SignageClient::from_config(&config.signageos).expect("Failed to create test client"),
    );
    let audit_service =
        Arc::new(AuditService::new(&config.audit).expect("Failed to open test audit log"));
    let unlock_service = Arc::new(UnlockService::new(
        client,
        audit_service.clone(),
        config.signageos.max_pages,
    ));

    let state = Arc::new(AppState {
        config,
        audit_service,
        unlock_service,
    });

    routes::create_router(state)
}

// ==================== 请求辅助 ====================

/// 发送 POST JSON 请求，返回状态码和解析后的响应体
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &str,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ==================== 审计文件读取 ====================

/// 读取活动审计文件的所有记录
pub fn read_audit_entries(audit_dir: &FsPath) -> Vec<serde_json::Value> {
    let path = audit_dir.join("audit.log");
    let content = std::fs::read_to_string(path).unwrap_or_default();
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("audit line must be complete JSON"))
        .collect()
}

/// 列出活动文件与全部轮转文件
pub fn audit_files(audit_dir: &FsPath) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(audit_dir)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("audit.log"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

// ==================== signageOS 替身 ====================

/// 替身的可编程状态
pub struct MockState {
    /// 完整设备清单，按 offset/limit 切片分页
    pub devices: Mutex<Vec<serde_json::Value>>,
    /// 页载荷形态: "bare" | "items" | "data" | "devices"
    pub page_shape: Mutex<String>,
    /// 清单端点的响应状态码（非 200 用于模拟上游故障）
    pub list_status: Mutex<u16>,
    /// 策略删除应答 (status, body)
    pub delete_reply: Mutex<(u16, String)>,
    /// 收到的删除调用 (device_id, policy_id)
    pub delete_calls: Mutex<Vec<(String, String)>>,
    /// 清单端点被调用的次数
    pub list_calls: Mutex<u32>,
}

/// 进程内 signageOS 替身服务器
pub struct MockSignageOs {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockSignageOs {
    /// 启动替身，返回其地址与可编程状态
    pub async fn spawn(devices: Vec<serde_json::Value>) -> Self {
        let state = Arc::new(MockState {
            devices: Mutex::new(devices),
            page_shape: Mutex::new("items".to_string()),
            list_status: Mutex::new(200),
            delete_reply: Mutex::new((204, String::new())),
            delete_calls: Mutex::new(Vec::new()),
            list_calls: Mutex::new(0),
        });

        let router = Router::new()
            .route("/devices", get(list_devices))
            .route(
                "/devices/{device_id}/policies/{policy_id}",
                delete(delete_policy),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock listener");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self { addr, state }
    }

    pub fn api_base(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn set_page_shape(&self, shape: &str) {
        *self.state.page_shape.lock().await = shape.to_string();
    }

    pub async fn set_list_status(&self, status: u16) {
        *self.state.list_status.lock().await = status;
    }

    pub async fn set_delete_reply(&self, status: u16, body: &str) {
        *self.state.delete_reply.lock().await = (status, body.to_string());
    }

    pub async fn delete_calls(&self) -> Vec<(String, String)> {
        self.state.delete_calls.lock().await.clone()
    }

    pub async fn list_calls(&self) -> u32 {
        *self.state.list_calls.lock().await
    }
}

/// 一个永远连接失败的地址：绑定后立刻释放端口
pub async fn unreachable_api_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn list_devices(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    *state.list_calls.lock().await += 1;

    let status = *state.list_status.lock().await;
    if status != 200 {
        return (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "inventory backend unavailable".to_string(),
        )
            .into_response();
    }

    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(100);
    let offset: usize = params
        .get("offset")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let devices = state.devices.lock().await;
    let page: Vec<serde_json::Value> = if offset < devices.len() {
        let end = (offset + limit).min(devices.len());
        devices[offset..end].to_vec()
    } else {
        Vec::new()
    };

    let shape = state.page_shape.lock().await.clone();
    let payload = match shape.as_str() {
        "bare" => serde_json::Value::Array(page),
        key => serde_json::json!({ key: page }),
    };

    Json(payload).into_response()
}

async fn delete_policy(
    State(state): State<Arc<MockState>>,
    Path((device_id, policy_id)): Path<(String, String)>,
) -> Response {
    state.delete_calls.lock().await.push((device_id, policy_id));

    let (status, body) = state.delete_reply.lock().await.clone();
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}
