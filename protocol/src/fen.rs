//! FEN 格式解析和生成
//!
//! 只使用前两段：`<棋盘> <走子方>`。
//! 易位权、吃过路兵目标格、步数等字段可以出现但会被忽略。
//!
//! 示例：
//! `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w`

use crate::board::Board;
use crate::constants::BOARD_SIZE;
use crate::error::ChessError;
use crate::game::Game;
use crate::piece::{Color, Coord, Unit};

/// 初始局面 FEN
pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w";

/// FEN 格式处理
pub struct Fen;

impl Fen {
    /// 解析 FEN 字符串为对局
    pub fn parse(fen: &str) -> Result<Game, ChessError> {
        let mut parts = fen.split_whitespace();
        let placement = parts.next().ok_or_else(|| ChessError::InvalidFen {
            reason: "Empty FEN string".to_string(),
        })?;

        let board = Self::parse_board(placement)?;

        // 走子方（默认白方）
        let turn = match parts.next() {
            Some(field) => {
                let mut chars = field.chars();
                match (chars.next().and_then(Color::from_fen_char), chars.next()) {
                    (Some(color), None) => color,
                    _ => {
                        return Err(ChessError::InvalidFen {
                            reason: format!("Invalid side to move: {}", field),
                        })
                    }
                }
            }
            None => Color::White,
        };

        Ok(Game::from_board(board, turn))
    }

    /// 解析棋盘部分
    pub fn parse_board(placement: &str) -> Result<Board, ChessError> {
        let mut board = Board::empty();
        let rows: Vec<&str> = placement.split('/').collect();

        if rows.len() != BOARD_SIZE {
            return Err(ChessError::InvalidFen {
                reason: format!("Expected {} rows, got {}", BOARD_SIZE, rows.len()),
            });
        }

        // FEN 从上到下是 rank=7 到 rank=0
        for (row_idx, row) in rows.iter().enumerate() {
            let rank = (BOARD_SIZE - 1 - row_idx) as u8;
            let mut file = 0usize;

            for c in row.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if skip == 0 {
                        return Err(ChessError::InvalidFen {
                            reason: format!("Zero skip in row {}", row_idx + 1),
                        });
                    }
                    file += skip as usize;
                } else {
                    let unit = Unit::from_fen_char(c).ok_or_else(|| ChessError::InvalidFen {
                        reason: format!("Invalid piece character: {}", c),
                    })?;
                    if file >= BOARD_SIZE {
                        return Err(Self::too_many_files(row_idx));
                    }
                    board.set(Coord::new_unchecked(file as u8, rank), Some(unit));
                    file += 1;
                }

                if file > BOARD_SIZE {
                    return Err(Self::too_many_files(row_idx));
                }
            }

            if file != BOARD_SIZE {
                return Err(ChessError::InvalidFen {
                    reason: format!("Row {} has {} files, expected {}", row_idx + 1, file, BOARD_SIZE),
                });
            }
        }

        Ok(board)
    }

    fn too_many_files(row_idx: usize) -> ChessError {
        ChessError::InvalidFen {
            reason: format!("Row {} has more than {} files", row_idx + 1, BOARD_SIZE),
        }
    }

    /// 将对局转换为 FEN 字符串（棋盘 + 走子方）
    pub fn to_fen(game: &Game) -> String {
        format!(
            "{} {}",
            Self::board_to_fen(game.board()),
            game.turn().to_fen_char()
        )
    }

    /// 将棋盘转换为 FEN 棋盘部分
    pub fn board_to_fen(board: &Board) -> String {
        let mut rows = Vec::with_capacity(BOARD_SIZE);

        for rank in (0..BOARD_SIZE as u8).rev() {
            let mut row = String::new();
            let mut empty = 0;

            for file in 0..BOARD_SIZE as u8 {
                match board.get(Coord::new_unchecked(file, rank)) {
                    Some(unit) => {
                        if empty > 0 {
                            row.push_str(&empty.to_string());
                            empty = 0;
                        }
                        row.push(unit.to_fen_char());
                    }
                    None => empty += 1,
                }
            }

            if empty > 0 {
                row.push_str(&empty.to_string());
            }
            rows.push(row);
        }

        rows.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceKind;

    #[test]
    fn test_initial_fen() {
        let game = Fen::parse(INITIAL_FEN).unwrap();
        assert_eq!(game.board(), &Board::initial());
        assert_eq!(game.turn(), Color::White);
        assert_eq!(Fen::to_fen(&game), INITIAL_FEN);
    }

    #[test]
    fn test_full_fen_fields_ignored() {
        let game =
            Fen::parse("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(
            game.board().get("e4".parse().unwrap()),
            Some(Unit::new(PieceKind::Pawn, Color::White))
        );
        assert_eq!(game.board().get("e2".parse().unwrap()), None);
    }

    #[test]
    fn test_sparse_board() {
        let game = Fen::parse("4k3/8/8/8/8/8/8/3QK3 w").unwrap();
        assert_eq!(game.board().all_pieces().len(), 3);
        assert_eq!(
            game.board().get("d1".parse().unwrap()),
            Some(Unit::new(PieceKind::Queen, Color::White))
        );
        assert_eq!(Fen::to_fen(&game), "4k3/8/8/8/8/8/8/3QK3 w");
    }

    #[test]
    fn test_invalid_fen() {
        for fen in [
            "",
            "8/8/8/8/8/8/8 w",
            "8/8/8/8/8/8/8/9 w",
            "8/8/8/8/8/8/8/7 w",
            "8/8/8/8/8/8/8/ppppppppp w",
            "8/8/8/8/8/8/8/7x w",
            "8/8/8/8/8/8/8/8 x",
            "8/8/8/8/8/8/8/8 wb",
        ] {
            assert!(
                matches!(Fen::parse(fen), Err(ChessError::InvalidFen { .. })),
                "应拒绝 {:?}",
                fen
            );
        }
    }
}
