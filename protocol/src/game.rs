//! 对局裁判
//!
//! 持有棋盘与走子方，校验并执行单步走法。
//! 吃掉对方的王即结束对局，这是唯一的终局规则（不做将死判定）。

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::ChessError;
use crate::moves::{Move, MoveGenerator};
use crate::piece::{Color, Coord, PieceKind};

/// 单步走法的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// 对局继续
    Continuing,
    /// 王被吃，对局结束
    GameEnded { winner: Color },
}

impl Outcome {
    /// 对局是否已结束
    pub fn is_over(&self) -> bool {
        matches!(self, Outcome::GameEnded { .. })
    }
}

/// 对局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    turn: Color,
    history: Vec<Move>,
}

impl Game {
    /// 标准开局，白方先走
    pub fn new() -> Self {
        Self::from_board(Board::initial(), Color::White)
    }

    /// 从指定局面开始
    pub fn from_board(board: Board, turn: Color) -> Self {
        Self {
            board,
            turn,
            history: Vec::new(),
        }
    }

    /// 执行走法
    ///
    /// 成功时移动棋子（覆盖被吃的棋子）、清空起点并切换走子方。
    /// 失败时局面和走子方都不变。
    pub fn play(&mut self, color: Color, from: Coord, to: Coord) -> Result<Outcome, ChessError> {
        if self.turn != color {
            return Err(ChessError::OutOfTurn);
        }

        let targets = MoveGenerator::legal_moves(&self.board, from)?;
        if !targets.contains(&to) {
            return Err(ChessError::IllegalMove { from, to });
        }

        let captured = self.board.move_piece(from, to);
        self.turn = self.turn.opponent();

        let record = match captured {
            Some(unit) => Move::with_capture(from, to, unit),
            None => Move::new(from, to),
        };
        self.history.push(record);

        match captured {
            Some(unit) if unit.kind == PieceKind::King => Ok(Outcome::GameEnded { winner: color }),
            _ => Ok(Outcome::Continuing),
        }
    }

    /// 当前走子方
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// 当前棋盘
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// 已执行的走法
    pub fn history(&self) -> &[Move] {
        &self.history
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::Fen;
    use crate::piece::Unit;

    fn coord(s: &str) -> Coord {
        s.parse().unwrap()
    }

    #[test]
    fn test_opening_knight_move() {
        let mut game = Game::new();

        let outcome = game.play(Color::White, coord("b1"), coord("c3"));
        assert_eq!(outcome, Ok(Outcome::Continuing));
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(
            game.board().get(coord("c3")),
            Some(Unit::new(PieceKind::Knight, Color::White))
        );
        assert_eq!(game.board().get(coord("b1")), None);
        assert_eq!(game.history(), &[Move::new(coord("b1"), coord("c3"))]);
    }

    #[test]
    fn test_out_of_turn() {
        let mut game = Game::new();
        let before = game.clone();

        assert_eq!(
            game.play(Color::Black, coord("b8"), coord("c6")),
            Err(ChessError::OutOfTurn)
        );
        assert_eq!(game, before);
    }

    #[test]
    fn test_illegal_target() {
        let mut game = Game::new();

        assert_eq!(
            game.play(Color::White, coord("e2"), coord("e5")),
            Err(ChessError::IllegalMove {
                from: coord("e2"),
                to: coord("e5")
            })
        );
        assert_eq!(game.turn(), Color::White);
    }

    #[test]
    fn test_same_square_is_illegal() {
        let mut game = Game::new();
        assert!(matches!(
            game.play(Color::White, coord("g1"), coord("g1")),
            Err(ChessError::IllegalMove { .. })
        ));
    }

    #[test]
    fn test_empty_origin() {
        let mut game = Game::new();
        assert_eq!(
            game.play(Color::White, coord("e4"), coord("e5")),
            Err(ChessError::InvalidUnit { at: coord("e4") })
        );
        assert_eq!(game.turn(), Color::White);
    }

    #[test]
    fn test_unreachable_target_for_other_unit() {
        // 按当前规则只校验目标格；黑马的目标格里没有 e5
        let mut game = Game::new();
        assert!(game.play(Color::White, coord("g8"), coord("e5")).is_err());
        assert_eq!(game.turn(), Color::White);
    }

    #[test]
    fn test_turn_alternates() {
        let mut game = Game::new();
        let script = [
            (Color::White, "e2", "e4", true),
            (Color::White, "d2", "d4", false),
            (Color::Black, "e7", "e5", true),
            (Color::Black, "d7", "d5", false),
            (Color::White, "g1", "g3", false),
            (Color::White, "g1", "f3", true),
        ];

        for (color, from, to, accepted) in script {
            let before = game.turn();
            let result = game.play(color, coord(from), coord(to));
            assert_eq!(result.is_ok(), accepted, "{:?} {} {}", color, from, to);
            if accepted {
                assert_eq!(game.turn(), before.opponent());
            } else {
                assert_eq!(game.turn(), before);
            }
        }
        assert_eq!(game.history().len(), 3);
    }

    #[test]
    fn test_capture_king_ends_game() {
        let mut game = Fen::parse("4k3/8/8/8/8/8/8/3QK3 w").unwrap();

        assert_eq!(
            game.play(Color::White, coord("d1"), coord("d7")),
            Ok(Outcome::Continuing)
        );
        assert_eq!(
            game.play(Color::Black, coord("e8"), coord("f8")),
            Ok(Outcome::Continuing)
        );

        let outcome = game.play(Color::White, coord("d7"), coord("f7")).unwrap();
        assert_eq!(outcome, Outcome::Continuing);
        game.play(Color::Black, coord("f8"), coord("g8")).unwrap();

        let outcome = game.play(Color::White, coord("f7"), coord("g8")).unwrap();
        assert_eq!(outcome, Outcome::GameEnded { winner: Color::White });
        assert!(outcome.is_over());
        assert_eq!(game.board().find_king(Color::Black), None);
        assert_eq!(
            game.history().last().and_then(|mv| mv.captured),
            Some(Unit::new(PieceKind::King, Color::Black))
        );
    }

    #[test]
    fn test_queen_captures_king_directly() {
        let mut game = Fen::parse("4k3/8/8/8/8/8/8/4QK2 w").unwrap();
        assert_eq!(
            game.play(Color::White, coord("e1"), coord("e8")),
            Ok(Outcome::GameEnded { winner: Color::White })
        );
    }

    #[test]
    fn test_ordinary_capture_continues() {
        let mut game = Fen::parse("4k3/8/8/3p4/4P3/8/8/4K3 w").unwrap();
        assert_eq!(
            game.play(Color::White, coord("e4"), coord("d5")),
            Ok(Outcome::Continuing)
        );
        assert_eq!(game.board().all_pieces().len(), 3);
    }
}
