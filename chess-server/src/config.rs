//! 服务端配置
//!
//! 查找顺序：命令行指定的文件，其次 `<配置目录>/chess-server/server.json`，
//! 都没有时使用默认值。之后再应用环境变量覆盖。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use protocol::{NetworkConfig, ID_MAX_RETRIES, MAILBOX_CAPACITY};

/// 覆盖监听地址的环境变量
pub const HOST_ENV: &str = "CHESS_SERVER_HOST";

/// 覆盖监听端口的环境变量
pub const PORT_ENV: &str = "CHESS_SERVER_PORT";

/// 未设置 `RUST_LOG` 时的日志过滤规则
pub const DEFAULT_LOG_FILTER: &str = "chess_server=debug,protocol=info";

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub network: NetworkConfig,
    /// 会话信箱容量
    pub mailbox_capacity: usize,
    /// 生成身份/会话 ID 的最大重试次数
    pub max_id_retries: u32,
    /// 日志过滤规则（`RUST_LOG` 优先）
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            mailbox_capacity: MAILBOX_CAPACITY,
            max_id_retries: ID_MAX_RETRIES,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ServerConfig {
    /// 加载配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_overrides(std::env::var(HOST_ENV).ok(), std::env::var(PORT_ENV).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件读取，缺失的字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("配置文件格式错误: {:?}", path))
    }

    /// 应用地址和端口覆盖
    pub fn apply_overrides(&mut self, host: Option<String>, port: Option<String>) -> Result<()> {
        if let Some(host) = host {
            self.network.host = host;
        }
        if let Some(port) = port {
            self.network.port = port
                .parse()
                .with_context(|| format!("{} 不是有效端口: {:?}", PORT_ENV, port))?;
        }
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        ensure!(self.mailbox_capacity >= 1, "mailbox_capacity 必须至少为 1");
        ensure!(self.max_id_retries >= 1, "max_id_retries 必须至少为 1");
        Ok(())
    }
}

/// 默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chess-server").join("server.json"))
}
