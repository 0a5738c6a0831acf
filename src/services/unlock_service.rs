//! 解锁编排服务
//! 每个请求走一遍校验 → 解析 → 上游删除的状态机，所有终态写一条审计

use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::models::audit::{AuditAction, AuditEntry, AuditStatus};
use crate::models::unlock::{UnlockRequest, UnlockResponse};
use crate::services::audit_service::AuditService;
use crate::services::resolver::DeviceResolver;
use crate::services::signage_client::SignageClient;

/// 请求的解析键：直接给定的设备标识优先于 IP 查找
enum ResolutionKey<'a> {
    Direct(&'a str),
    ByIp(&'a str),
}

/// 解锁编排服务
pub struct UnlockService {
    client: Arc<SignageClient>,
    resolver: DeviceResolver,
    audit: Arc<AuditService>,
}

impl UnlockService {
    pub fn new(client: Arc<SignageClient>, audit: Arc<AuditService>, max_pages: usize) -> Self {
        let resolver = DeviceResolver::new(client.clone(), max_pages);
        Self {
            client,
            resolver,
            audit,
        }
    }

    /// 处理一次解锁请求
    ///
    /// 请求体以原始字节进入，解析失败也要落审计——每个入站请求不论走到
    /// 哪个分支都恰好写一条记录。
    pub async fn unlock(
        &self,
        body: &[u8],
        remote_addr: IpAddr,
    ) -> Result<UnlockResponse, AppError> {
        let mut audit = RequestAudit::new(remote_addr);

        // ===== 校验 =====
        let request: UnlockRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(_) => {
                self.record(&audit, AuditStatus::BadRequest, "Invalid JSON body").await;
                return Err(AppError::BadRequest("Invalid JSON body".to_string()));
            }
        };
        audit.fill_from(&request);

        let Some(policy_id) = request.policy_id() else {
            return self.bad_request(&audit).await;
        };

        let key = match (request.device_id(), request.device_ip()) {
            (Some(id), _) => ResolutionKey::Direct(id),
            (None, Some(ip)) => ResolutionKey::ByIp(ip),
            (None, None) => {
                return self.bad_request(&audit).await;
            }
        };

        // ===== 解析 =====
        let device_id = match key {
            ResolutionKey::Direct(id) => id.to_string(),
            ResolutionKey::ByIp(target_ip) => match self.resolver.resolve(target_ip).await {
                Err(err) => {
                    let detail = match &err {
                        AppError::Resolution(msg) => msg.clone(),
                        other => other.to_string(),
                    };
                    self.record(&audit, AuditStatus::Error, &detail).await;
                    return Err(err);
                }
                Ok(None) => {
                    self.record(&audit, AuditStatus::NotFound, "No device matched IP").await;
                    return Err(AppError::NotFound(target_ip.to_string()));
                }
                Ok(Some(record)) => match record.identifier() {
                    Some(id) => id,
                    None => {
                        let rendered = record.to_json_string();
                        let detail =
                            format!("device found but no id field, device={}", rendered);
                        self.record(&audit, AuditStatus::NoDeviceId, &detail).await;
                        return Err(AppError::MissingDeviceId(rendered));
                    }
                },
            },
        };
        audit.device_id = Some(device_id.clone());

        // ===== 上游删除 =====
        match self.client.delete_policy(&device_id, policy_id).await {
            Err(err) => {
                let detail = match &err {
                    AppError::UpstreamException(msg) => msg.clone(),
                    other => other.to_string(),
                };
                self.record(&audit, AuditStatus::Exception, &detail).await;
                Err(err)
            }
            Ok(reply) if reply.is_success() => {
                let entry = audit.entry(
                    AuditAction::Unlock,
                    AuditStatus::Success,
                    format!("status={}", reply.status),
                );
                self.audit.record(&entry).await;

                info!(
                    device_id = %device_id,
                    policy_id = %policy_id,
                    status = reply.status,
                    "Policy removed"
                );

                Ok(UnlockResponse {
                    message: format!("Policy {} removed from device {}", policy_id, device_id),
                })
            }
            Ok(reply) => {
                let detail = format!("status={}, body={}", reply.status, reply.body);
                self.record(&audit, AuditStatus::Failed, &detail).await;
                Err(AppError::UpstreamRejected {
                    status: reply.status,
                    body: reply.body,
                })
            }
        }
    }

    async fn bad_request(&self, audit: &RequestAudit) -> Result<UnlockResponse, AppError> {
        let message = "deviceIp or deviceId and policyId are required";
        self.record(audit, AuditStatus::BadRequest, message).await;
        Err(AppError::BadRequest(message.to_string()))
    }

    /// 未成功终态统一以 unlock_attempt 落账
    async fn record(&self, audit: &RequestAudit, status: AuditStatus, detail: &str) {
        let entry = audit.entry(AuditAction::UnlockAttempt, status, detail.to_string());
        self.audit.record(&entry).await;
    }
}

/// 单个请求沉淀到审计记录里的字段
struct RequestAudit {
    device_ip: Option<String>,
    device_id: Option<String>,
    policy_id: Option<String>,
    org_id: Option<String>,
    user: Option<String>,
    remote_addr: String,
}

impl RequestAudit {
    fn new(remote_addr: IpAddr) -> Self {
        Self {
            device_ip: None,
            device_id: None,
            policy_id: None,
            org_id: None,
            user: None,
            remote_addr: remote_addr.to_string(),
        }
    }

    fn fill_from(&mut self, request: &UnlockRequest) {
        self.device_ip = request.device_ip().map(str::to_string);
        self.device_id = request.device_id().map(str::to_string);
        self.policy_id = request.policy_id().map(str::to_string);
        self.org_id = request.org_id.clone();
        self.user = request.support_user.clone();
    }

    fn entry(&self, action: AuditAction, status: AuditStatus, detail: String) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            action,
            device_ip: self.device_ip.clone(),
            device_id: self.device_id.clone(),
            policy_id: self.policy_id.clone(),
            org_id: self.org_id.clone(),
            user: self.user.clone(),
            remote_addr: self.remote_addr.clone(),
            status,
            detail,
        }
    }
}
