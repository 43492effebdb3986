//! 国际象棋对战服务端
//!
//! 包含:
//! - 对局会话（每对参与者一个任务）
//! - 撮合器（身份与会话登记）
//! - TCP 接入层
//! - 服务端配置

pub mod config;
pub mod matchmaker;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use matchmaker::{Admission, Matchmaker, MatchmakerError, MatchmakerHandle, MatchmakerStats};
pub use server::Server;
pub use session::{
    EndReason, Identity, Seat, Session, SessionError, SessionId, SessionReport, SessionState,
    Signal,
};
