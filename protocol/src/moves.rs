//! 走法生成
//!
//! 只计算单个棋子可到达的目标格，不做将军检测：
//! 王可以走进被攻击的格子，其他棋子也可以让己方王暴露。

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::ChessError;
use crate::piece::{Color, Coord, PieceKind, Unit};

/// 马的 8 个 L 形偏移
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-1, 2),
    (1, 2),
    (2, -1),
    (2, 1),
    (-1, -2),
    (1, -2),
    (-2, -1),
    (-2, 1),
];

/// 王的 8 个相邻偏移
const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// 直线方向（车、后）
const ORTHOGONAL: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// 斜线方向（象、后）
const DIAGONAL: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// 走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始位置
    pub from: Coord,
    /// 目标位置
    pub to: Coord,
    /// 被吃的棋子（如果有）
    pub captured: Option<Unit>,
}

impl Move {
    /// 创建新走法
    pub fn new(from: Coord, to: Coord) -> Self {
        Self {
            from,
            to,
            captured: None,
        }
    }

    /// 创建带吃子的走法
    pub fn with_capture(from: Coord, to: Coord, captured: Unit) -> Self {
        Self {
            from,
            to,
            captured: Some(captured),
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 计算 `origin` 上棋子的全部目标格
    ///
    /// 起点为空时返回 [`ChessError::InvalidUnit`]。结果中的坐标互不重复，且都在棋盘内。
    pub fn legal_moves(board: &Board, origin: Coord) -> Result<Vec<Coord>, ChessError> {
        let unit = board
            .get(origin)
            .ok_or(ChessError::InvalidUnit { at: origin })?;

        let mut targets = Vec::with_capacity(28);
        match unit.kind {
            PieceKind::Pawn => Self::generate_pawn_moves(board, origin, unit.color, &mut targets),
            PieceKind::Knight => {
                Self::generate_step_moves(board, origin, unit.color, &KNIGHT_OFFSETS, &mut targets)
            }
            PieceKind::Bishop => {
                Self::generate_sliding_moves(board, origin, unit.color, &DIAGONAL, &mut targets)
            }
            PieceKind::Rook => {
                Self::generate_sliding_moves(board, origin, unit.color, &ORTHOGONAL, &mut targets)
            }
            PieceKind::Queen => {
                Self::generate_sliding_moves(board, origin, unit.color, &ORTHOGONAL, &mut targets);
                Self::generate_sliding_moves(board, origin, unit.color, &DIAGONAL, &mut targets);
            }
            PieceKind::King => {
                Self::generate_step_moves(board, origin, unit.color, &KING_OFFSETS, &mut targets)
            }
        }

        Ok(targets)
    }

    /// 生成兵的走法（无升变、无吃过路兵）
    fn generate_pawn_moves(board: &Board, pos: Coord, color: Color, targets: &mut Vec<Coord>) {
        let forward = color.forward();

        // 前进一格，必须为空
        if let Some(ahead) = pos.offset(0, forward) {
            if board.get(ahead).is_none() {
                targets.push(ahead);

                // 起始横排可前进两格，中间和目标都必须为空
                if pos.rank() == color.pawn_rank() {
                    if let Some(jump) = pos.offset(0, 2 * forward) {
                        if board.get(jump).is_none() {
                            targets.push(jump);
                        }
                    }
                }
            }
        }

        // 斜前方吃子
        for df in [-1i8, 1i8] {
            if let Some(diagonal) = pos.offset(df, forward) {
                if matches!(board.get(diagonal), Some(target) if target.color != color) {
                    targets.push(diagonal);
                }
            }
        }
    }

    /// 生成固定偏移的走法（马、王）
    fn generate_step_moves(
        board: &Board,
        pos: Coord,
        color: Color,
        offsets: &[(i8, i8)],
        targets: &mut Vec<Coord>,
    ) {
        for &(df, dr) in offsets {
            if let Some(to) = pos.offset(df, dr) {
                Self::try_add_target(board, to, color, targets);
            }
        }
    }

    /// 沿各方向射线搜索（象、车、后）
    ///
    /// 空格可走并继续；敌方棋子可吃并停止；己方棋子不可走并停止。
    fn generate_sliding_moves(
        board: &Board,
        pos: Coord,
        color: Color,
        directions: &[(i8, i8)],
        targets: &mut Vec<Coord>,
    ) {
        for &(df, dr) in directions {
            let mut current = pos;
            while let Some(to) = current.offset(df, dr) {
                if let Some(target) = board.get(to) {
                    if target.color != color {
                        targets.push(to);
                    }
                    break;
                }
                targets.push(to);
                current = to;
            }
        }
    }

    /// 尝试添加目标格（空格或敌方棋子）
    fn try_add_target(board: &Board, to: Coord, color: Color, targets: &mut Vec<Coord>) {
        match board.get(to) {
            Some(target) if target.color == color => {}
            _ => targets.push(to),
        }
    }
}
