//! 审计日志服务
//! 追加写入的 JSON Lines 文件，按大小轮转，保留有限数量的历史文件

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::config::AuditConfig;
use crate::error::AppError;
use crate::models::audit::AuditEntry;

/// 审计日志服务
///
/// 每个终态请求恰好产生一条记录。一条记录序列化为单行 JSON，整行在互斥
/// 锁下一次写入，因此并发请求只会以行为粒度交错，不会出现半条记录。
pub struct AuditService {
    appender: Mutex<RotatingAppender>,
}

impl AuditService {
    /// 打开（必要时创建）审计日志文件
    pub fn new(config: &AuditConfig) -> Result<Self, AppError> {
        let appender = RotatingAppender::open(
            Path::new(&config.log_path),
            config.max_bytes,
            config.backup_count,
        )
        .map_err(|e| {
            AppError::Config(format!("Failed to open audit log {}: {}", config.log_path, e))
        })?;

        Ok(Self {
            appender: Mutex::new(appender),
        })
    }

    /// 追加一条审计记录
    ///
    /// 写入失败只记错误日志，不改变请求的 HTTP 结果：上游操作可能已经
    /// 完成，不能因为本地磁盘问题向调用方误报设备状态。
    pub async fn record(&self, entry: &AuditEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize audit entry");
                return;
            }
        };

        let mut appender = self.appender.lock().await;
        if let Err(e) = appender.append_line(&line) {
            tracing::error!(
                error = %e,
                status = entry.status.as_str(),
                "Failed to append audit entry"
            );
        }
    }
}

/// 按大小轮转的行追加器
///
/// 轮转语义：当一次追加会使当前文件超过阈值时，把 audit.log.{n} 依次
/// 上移（丢弃最旧的一个），当前文件改名为 audit.log.1，再从空文件继续。
/// backup_count 为 0 时原地截断，不保留历史。
struct RotatingAppender {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    file: File,
    len: u64,
}

impl RotatingAppender {
    fn open(path: &Path, max_bytes: u64, backup_count: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            max_bytes,
            backup_count,
            file,
            len,
        })
    }

    /// 整行写入；轮转和写入在同一把锁下完成，记录不会丢失或重复
    fn append_line(&mut self, line: &str) -> io::Result<()> {
        let record_len = line.len() as u64 + 1;

        // 空文件不轮转，单条超长记录仍然落在当前文件
        if self.len > 0 && self.len + record_len > self.max_bytes {
            self.rotate()?;
        }

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.file.write_all(&buf)?;
        self.file.flush()?;
        self.len += record_len;

        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        if self.backup_count == 0 {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.len = 0;
            return Ok(());
        }

        // 丢弃最旧的轮转文件
        let oldest = self.backup_path(self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // audit.log.{n} -> audit.log.{n+1}
        for n in (1..self.backup_count).rev() {
            let from = self.backup_path(n);
            if from.exists() {
                fs::rename(&from, self.backup_path(n + 1))?;
            }
        }

        fs::rename(&self.path, self.backup_path(1))?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.len = 0;

        Ok(())
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(format!(".{}", n));
        PathBuf::from(os)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appender(dir: &tempfile::TempDir, max_bytes: u64, backup_count: usize) -> RotatingAppender {
        let path = dir.path().join("audit.log");
        RotatingAppender::open(&path, max_bytes, backup_count).unwrap()
    }

    #[test]
    fn test_append_writes_single_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = appender(&dir, 1024, 3);

        app.append_line("{\"status\":\"SUCCESS\"}").unwrap();
        app.append_line("{\"status\":\"FAILED\"}").unwrap();

        let content = fs::read_to_string(dir.path().join("audit.log")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_rotation_shifts_and_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        // 阈值只够容纳一条记录
        let mut app = appender(&dir, 30, 2);

        for n in 0..5 {
            app.append_line(&format!("{{\"seq\":{}}}", n)).unwrap();
        }

        // 活动文件 + 最多两个轮转文件
        assert!(dir.path().join("audit.log").exists());
        assert!(dir.path().join("audit.log.1").exists());
        assert!(dir.path().join("audit.log.2").exists());
        assert!(!dir.path().join("audit.log.3").exists());

        // 最新记录在活动文件，次新在 .1
        let live = fs::read_to_string(dir.path().join("audit.log")).unwrap();
        assert!(live.contains("\"seq\":4"));
        let first = fs::read_to_string(dir.path().join("audit.log.1")).unwrap();
        assert!(first.contains("\"seq\":3"));
    }

    #[test]
    fn test_zero_backup_count_truncates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = appender(&dir, 30, 0);

        for n in 0..4 {
            app.append_line(&format!("{{\"seq\":{}}}", n)).unwrap();
        }

        assert!(!dir.path().join("audit.log.1").exists());
        let live = fs::read_to_string(dir.path().join("audit.log")).unwrap();
        assert!(live.contains("\"seq\":3"));
    }

    #[test]
    fn test_oversized_record_still_lands() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = appender(&dir, 16, 2);

        let big = format!("{{\"detail\":\"{}\"}}", "x".repeat(64));
        app.append_line(&big).unwrap();

        let live = fs::read_to_string(dir.path().join("audit.log")).unwrap();
        assert_eq!(live.lines().count(), 1);
    }

    #[test]
    fn test_reopen_resumes_existing_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");

        {
            let mut app = RotatingAppender::open(&path, 1024, 3).unwrap();
            app.append_line("{\"seq\":0}").unwrap();
        }

        let app = RotatingAppender::open(&path, 1024, 3).unwrap();
        assert_eq!(app.len, fs::metadata(&path).unwrap().len());
    }
}
