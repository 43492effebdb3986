//! 国际象棋对战共享协议库
//!
//! 包含:
//! - 棋子、棋盘、坐标等核心数据结构
//! - 走法生成和对局裁判
//! - 消息类型定义 (Event, Request)
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 帧编解码
//! - 位置记号和 FEN

mod board;
mod constants;
mod error;
mod fen;
mod game;
mod message;
mod moves;
mod notation;
mod piece;
mod transport;

pub use board::Board;
pub use constants::*;
pub use error::{ChessError, ProtocolError, Result};
pub use fen::{Fen, INITIAL_FEN};
pub use game::{Game, Outcome};
pub use message::{Event, Request, Winner};
pub use moves::{Move, MoveGenerator};
pub use notation::Notation;
pub use piece::{Color, Coord, PieceKind, Unit};
pub use transport::{
    Connection, Connector, FrameReader, FrameWriter, Listener, NetworkConfig, TcpConnection,
    TcpConnector, TcpListener,
};
