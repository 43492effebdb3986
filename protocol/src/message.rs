//! 消息类型定义
//!
//! Event 为服务端发给参与者，Request 为参与者发给服务端。

use serde::{Deserialize, Serialize};

use crate::game::Outcome;
use crate::piece::{Color, Coord};

/// 胜者（相对于接收方）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    /// 接收方获胜
    You,
    /// 对手获胜
    Opponent,
}

impl Winner {
    /// 以 `receiver` 的视角描述 `winner`
    pub fn relative_to(winner: Color, receiver: Color) -> Self {
        if winner == receiver {
            Winner::You
        } else {
            Winner::Opponent
        }
    }
}

/// 服务端发送给参与者的事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// 双方就绪，对局开始
    GameStart { moves_first: bool },
    /// 对手的走法已被接受，除非对局结束否则轮到你
    PlayerTurn {
        from: Coord,
        to: Coord,
        outcome: Outcome,
    },
    /// 上一个请求被拒绝，请重新走棋
    IllegalMove,
    /// 你的走法已执行
    MoveAccepted { outcome: Outcome },
    /// 对局结束，会话随即关闭
    GameEnded { winner: Winner },
}

/// 参与者发送给服务端的请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// 走棋，坐标使用位置记号（如 `"e2"`）
    Move { from: String, to: String },
}

impl Request {
    /// 便捷构造走棋请求
    pub fn play(from: impl Into<String>, to: impl Into<String>) -> Self {
        Request::Move {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bincode() {
        let event = Event::PlayerTurn {
            from: "e2".parse().unwrap(),
            to: "e4".parse().unwrap(),
            outcome: Outcome::Continuing,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_request_json_shape() {
        let json = serde_json::to_value(Request::play("b1", "c3")).unwrap();
        assert_eq!(json, serde_json::json!({ "Move": { "from": "b1", "to": "c3" } }));
    }

    #[test]
    fn test_game_ended_json_shape() {
        let json = serde_json::to_value(Event::GameEnded {
            winner: Winner::You,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "GameEnded": { "winner": "You" } }));
    }

    #[test]
    fn test_winner_relative() {
        assert_eq!(Winner::relative_to(Color::White, Color::White), Winner::You);
        assert_eq!(Winner::relative_to(Color::White, Color::Black), Winner::Opponent);
    }
}
