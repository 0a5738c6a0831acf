//! signageOS API 客户端
//! 封装出站调用：设备清单分页拉取与策略删除

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use std::time::Duration;

use crate::config::SignageOsConfig;
use crate::error::AppError;

/// 认证凭据，部署时二选一（同时配置则 X-Auth 优先）
enum AuthCredentials {
    /// "tokenId:tokenSecret" 组合令牌，作为不透明的 X-Auth 头发送
    XAuth(Secret<String>),
    /// Bearer 令牌
    Bearer(Secret<String>),
}

/// 策略删除的上游应答
///
/// body 为 JSON 时取其紧凑渲染，否则保留原始文本。
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

impl UpstreamReply {
    /// 200/204 视为删除成功
    pub fn is_success(&self) -> bool {
        self.status == 200 || self.status == 204
    }
}

/// signageOS API 客户端
pub struct SignageClient {
    http: Client,
    api_base: String,
    auth: AuthCredentials,
}

impl SignageClient {
    /// 创建新的客户端，超时由配置给定并覆盖所有出站调用
    pub fn from_config(config: &SignageOsConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let auth = if let Some(token) = &config.x_auth {
            AuthCredentials::XAuth(token.clone())
        } else if let Some(key) = &config.api_key {
            AuthCredentials::Bearer(key.clone())
        } else {
            return Err(AppError::Config(
                "Either signageos.x_auth or signageos.api_key must be configured".to_string(),
            ));
        };

        let client = Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            auth,
        };

        // 凭据必须能构成合法的头部值，启动时即验证
        client.auth_headers()?;

        Ok(client)
    }

    /// 构造认证请求头
    fn auth_headers(&self) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match &self.auth {
            AuthCredentials::XAuth(token) => {
                let value = HeaderValue::from_str(token.expose_secret()).map_err(|_| {
                    AppError::Config("signageos.x_auth is not a valid header value".to_string())
                })?;
                headers.insert("X-Auth", value);
            }
            AuthCredentials::Bearer(key) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
                    .map_err(|_| {
                        AppError::Config("signageos.api_key is not a valid header value".to_string())
                    })?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        Ok(headers)
    }

    /// 拉取一页设备清单
    ///
    /// 传输失败、非 200 状态或响应体不是 JSON 都会立即终止解析流程。
    pub async fn list_devices(&self, offset: u64, limit: u64) -> Result<Value, AppError> {
        let response = self
            .http
            .get(format!("{}/devices", self.api_base))
            .headers(self.auth_headers()?)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await
            .map_err(|e| {
                AppError::Resolution(format!("Error calling signageOS devices list: {}", e))
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Resolution(format!(
                "signageOS responded {}: {}",
                status.as_u16(),
                body
            )));
        }

        response.json::<Value>().await.map_err(|_| {
            AppError::Resolution("signageOS returned invalid JSON for devices list".to_string())
        })
    }

    /// 删除设备上的策略
    ///
    /// 仅传输层失败返回错误；上游的任何状态码都交由调用方判定。
    pub async fn delete_policy(
        &self,
        device_id: &str,
        policy_id: &str,
    ) -> Result<UpstreamReply, AppError> {
        let response = self
            .http
            .delete(format!(
                "{}/devices/{}/policies/{}",
                self.api_base, device_id, policy_id
            ))
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| AppError::UpstreamException(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        // 能解析成 JSON 就用紧凑渲染，方便写进审计详情
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(value) => value.to_string(),
            Err(_) => text,
        };

        Ok(UpstreamReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(x_auth: Option<&str>, api_key: Option<&str>) -> SignageOsConfig {
        SignageOsConfig {
            api_base: "https://api.example.com/v2/".to_string(),
            x_auth: x_auth.map(|s| Secret::new(s.to_string())),
            api_key: api_key.map(|s| Secret::new(s.to_string())),
            request_timeout_secs: 15,
            max_pages: 100,
        }
    }

    #[test]
    fn test_client_requires_credentials() {
        let result = SignageClient::from_config(&config(None, None));
        assert!(result.is_err());
    }

    #[test]
    fn test_x_auth_preferred_over_bearer() {
        let client =
            SignageClient::from_config(&config(Some("id:secret"), Some("bearer-token"))).unwrap();
        let headers = client.auth_headers().unwrap();
        assert_eq!(headers.get("X-Auth").unwrap(), "id:secret");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_bearer_header_format() {
        let client = SignageClient::from_config(&config(None, Some("bearer-token"))).unwrap();
        let headers = client.auth_headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer bearer-token");
        assert!(headers.get("X-Auth").is_none());
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let client = SignageClient::from_config(&config(Some("id:secret"), None)).unwrap();
        assert_eq!(client.api_base, "https://api.example.com/v2");
    }

    #[test]
    fn test_invalid_header_value_rejected() {
        let result = SignageClient::from_config(&config(Some("id:secret\nbad"), None));
        assert!(result.is_err());
    }

    #[test]
    fn test_reply_success_codes() {
        assert!(UpstreamReply { status: 200, body: String::new() }.is_success());
        assert!(UpstreamReply { status: 204, body: String::new() }.is_success());
        assert!(!UpstreamReply { status: 403, body: String::new() }.is_success());
        assert!(!UpstreamReply { status: 404, body: String::new() }.is_success());
    }
}
