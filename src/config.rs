//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignageOsConfig {
    /// signageOS API 基础地址
    pub api_base: String,
    /// 组合令牌 "tokenId:tokenSecret"，以 X-Auth 头发送（优先）
    #[serde(default)]
    pub x_auth: Option<Secret<String>>,
    /// Bearer 令牌，以 Authorization: Bearer 头发送
    #[serde(default)]
    pub api_key: Option<Secret<String>>,
    /// 出站请求超时时间（秒），设备列表和策略删除共用
    pub request_timeout_secs: u64,
    /// 设备清单分页扫描的页数上限（防御上游永不缩页）
    pub max_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// 审计日志文件路径
    pub log_path: String,
    /// 单个文件大小阈值（字节），超过后轮转
    pub max_bytes: u64,
    /// 保留的轮转文件数量
    pub backup_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub signageos: SignageOsConfig,
    pub audit: AuditConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("signageos.api_base", "https://api.signageos.io/v2")?
            .set_default("signageos.request_timeout_secs", 15)?
            .set_default("signageos.max_pages", 100)?
            .set_default("audit.log_path", "./data/audit.log")?
            .set_default("audit.max_bytes", 5_242_880)?
            .set_default("audit.backup_count", 3)?;

        // 从环境变量加载配置（前缀为 UNLOCK_）
        settings = settings.add_source(
            Environment::with_prefix("UNLOCK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        // 必须配置 X-Auth 或 Bearer 令牌之一
        if self.signageos.x_auth.is_none() && self.signageos.api_key.is_none() {
            return Err(ConfigError::Message(
                "Set either UNLOCK_SIGNAGEOS__X_AUTH (tokenId:tokenSecret) or \
                 UNLOCK_SIGNAGEOS__API_KEY (Bearer token)"
                    .to_string(),
            ));
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证出站超时
        if self.signageos.request_timeout_secs < 1 || self.signageos.request_timeout_secs > 120 {
            return Err(ConfigError::Message(
                "signageos.request_timeout_secs must be between 1 and 120".to_string(),
            ));
        }

        // 验证分页上限
        if self.signageos.max_pages == 0 {
            return Err(ConfigError::Message(
                "signageos.max_pages must be greater than 0".to_string(),
            ));
        }

        // 验证审计日志轮转参数
        if self.audit.max_bytes == 0 {
            return Err(ConfigError::Message(
                "audit.max_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
