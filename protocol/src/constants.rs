//! 协议常量定义

use std::time::Duration;

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 棋盘边长（行列数相同）
pub const BOARD_SIZE: usize = 8;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 9990;

/// 参与者信箱容量（1 即近似无缓冲的阻塞发送）
pub const MAILBOX_CAPACITY: usize = 1;

/// 生成身份/对局 ID 时的最大重试次数
pub const ID_MAX_RETRIES: u32 = 64;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
