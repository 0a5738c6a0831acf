//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 应用错误类型
///
/// 每个失败分支都是请求级终态，本层不做重试。
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("No device matched: {0}")]
    NotFound(String),

    #[error("Inventory resolution failed: {0}")]
    Resolution(String),

    #[error("Device has no usable identifier: {0}")]
    MissingDeviceId(String),

    #[error("Upstream transport failure: {0}")]
    UpstreamException(String),

    #[error("Upstream rejected the request: status={status}, body={body}")]
    UpstreamRejected { status: u16, body: String },
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // 上游明确拒绝时把状态和响应体转述给支持人员，语义上仍算请求问题
            AppError::UpstreamRejected { .. } => StatusCode::BAD_REQUEST,
            AppError::Resolution(_)
            | AppError::MissingDeviceId(_)
            | AppError::UpstreamException(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取返回给调用方的消息
    pub fn user_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(_) => "No device found for the provided IP".to_string(),
            AppError::Resolution(msg) => {
                format!("Error while searching for device by IP: {}", msg)
            }
            AppError::MissingDeviceId(_) => {
                "Device found but could not determine device id; check device object".to_string()
            }
            AppError::UpstreamException(msg) => {
                format!("Exception during signageOS request: {}", msg)
            }
            AppError::UpstreamRejected { status, body } => {
                format!("Failed to remove policy: {} - {}", status, body)
            }
            AppError::Config(_) => "Configuration error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }
}

/// 错误响应 DTO，与成功响应共用 { message } 结构
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 记录错误日志
        tracing::error!(
            code = self.code(),
            message = %self,
            "Request failed"
        );

        let body = ErrorResponse {
            message: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}
