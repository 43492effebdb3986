//! 错误类型定义

use thiserror::Error;

use crate::piece::Coord;

/// 走子规则错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// 不是你的回合
    #[error("Player not in turn")]
    OutOfTurn,

    /// 目标格不在合法走法中（包括原地不动）
    #[error("Illegal move: {from} -> {to}")]
    IllegalMove { from: Coord, to: Coord },

    /// 起点没有棋子
    #[error("No unit at {at}")]
    InvalidUnit { at: Coord },

    /// 无法解析的位置记号
    #[error("Invalid position notation: {input:?}")]
    InvalidNotation { input: String },

    /// 无效的 FEN 字符串
    #[error("Invalid FEN string: {reason}")]
    InvalidFen { reason: String },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 消息体无法解码（帧本身完整，连接仍可继续使用）
    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
