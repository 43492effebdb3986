//! 棋盘状态

use std::fmt;

use crate::constants::BOARD_SIZE;
use crate::piece::{Color, Coord, PieceKind, Unit};

/// 底线棋子排列（a 列到 h 列）
const BACK_RANK: [PieceKind; BOARD_SIZE] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// 棋盘
///
/// 固定 8x8，`cells[rank][file]`，`cells[0]` 为白方底线。
/// 每格至多一个棋子。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Unit>; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            cells: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// 创建初始棋盘
    pub fn initial() -> Self {
        let mut board = Self::empty();

        for (file, kind) in BACK_RANK.iter().enumerate() {
            let file = file as u8;
            board.set(Coord::new_unchecked(file, 0), Some(Unit::new(*kind, Color::White)));
            board.set(Coord::new_unchecked(file, 1), Some(Unit::new(PieceKind::Pawn, Color::White)));
            board.set(Coord::new_unchecked(file, 6), Some(Unit::new(PieceKind::Pawn, Color::Black)));
            board.set(Coord::new_unchecked(file, 7), Some(Unit::new(*kind, Color::Black)));
        }

        board
    }

    /// 获取指定位置的棋子
    pub fn get(&self, coord: Coord) -> Option<Unit> {
        if coord.is_valid() {
            self.cells[coord.rank() as usize][coord.file() as usize]
        } else {
            None
        }
    }

    /// 设置指定位置的棋子
    pub fn set(&mut self, coord: Coord, unit: Option<Unit>) {
        if coord.is_valid() {
            self.cells[coord.rank() as usize][coord.file() as usize] = unit;
        }
    }

    /// 移动棋子（不检查规则），返回被吃掉的棋子
    pub fn move_piece(&mut self, from: Coord, to: Coord) -> Option<Unit> {
        let unit = self.get(from);
        let captured = self.get(to);
        self.set(from, None);
        self.set(to, unit);
        captured
    }

    /// 查找指定阵营的王
    pub fn find_king(&self, color: Color) -> Option<Coord> {
        self.pieces(color)
            .into_iter()
            .find(|(_, unit)| unit.kind == PieceKind::King)
            .map(|(coord, _)| coord)
    }

    /// 获取指定阵营的所有棋子位置
    pub fn pieces(&self, color: Color) -> Vec<(Coord, Unit)> {
        self.all_pieces()
            .into_iter()
            .filter(|(_, unit)| unit.color == color)
            .collect()
    }

    /// 获取所有棋子
    pub fn all_pieces(&self) -> Vec<(Coord, Unit)> {
        Coord::all()
            .filter_map(|coord| self.get(coord).map(|unit| (coord, unit)))
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

/// 文本棋盘（白方在下，FEN 字母，空格为 `.`），仅用于日志
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..BOARD_SIZE as u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..BOARD_SIZE as u8 {
                let c = self
                    .get(Coord::new_unchecked(file, rank))
                    .map_or('.', |unit| unit.to_fen_char());
                write!(f, " {}", c)?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}
