//! 棋子定义

use serde::{Deserialize, Serialize};

use crate::constants::BOARD_SIZE;

/// 棋子种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// 获取 FEN 字符（白方大写，黑方小写）
    pub fn to_fen_char(&self, color: Color) -> char {
        let c = match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<(PieceKind, Color)> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        Some((kind, color))
    }
}

/// 阵营（先手为白方）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// 白方（先手，在下方）
    White,
    /// 黑方（后手，在上方）
    Black,
}

impl Color {
    /// 获取对方阵营
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// 兵的前进方向（白方向上，黑方向下）
    pub fn forward(&self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// 兵的起始横排
    pub fn pawn_rank(&self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Color> {
        match c {
            'w' | 'W' => Some(Color::White),
            'b' | 'B' => Some(Color::Black),
            _ => None,
        }
    }
}

/// 棋子（种类 + 阵营），创建后不可变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub kind: PieceKind,
    pub color: Color,
}

impl Unit {
    /// 创建新棋子
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// 获取 FEN 字符
    pub fn to_fen_char(&self) -> char {
        self.kind.to_fen_char(self.color)
    }

    /// 从 FEN 字符解析
    pub fn from_fen_char(c: char) -> Option<Unit> {
        PieceKind::from_fen_char(c).map(|(kind, color)| Unit { kind, color })
    }

    /// 是否与另一棋子敌对
    pub fn is_opponent_of(&self, other: &Unit) -> bool {
        self.color != other.color
    }
}

/// 棋盘坐标：`file` 为列 (a-h → 0-7)，`rank` 为行 (1-8 → 0-7)
///
/// 只能通过带边界检查的构造函数得到，反序列化同样会检查边界。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "CoordRepr")]
pub struct Coord {
    file: u8,
    rank: u8,
}

/// 反序列化用的原始坐标
#[derive(Deserialize)]
struct CoordRepr {
    file: u8,
    rank: u8,
}

impl TryFrom<CoordRepr> for Coord {
    type Error = String;

    fn try_from(raw: CoordRepr) -> Result<Self, Self::Error> {
        Coord::new(raw.file, raw.rank)
            .ok_or_else(|| format!("coordinate ({}, {}) is off the board", raw.file, raw.rank))
    }
}

impl Coord {
    /// 创建新坐标
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if (file as usize) < BOARD_SIZE && (rank as usize) < BOARD_SIZE {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    /// 创建新坐标（调用方保证在棋盘内）
    pub(crate) const fn new_unchecked(file: u8, rank: u8) -> Self {
        debug_assert!((file as usize) < BOARD_SIZE && (rank as usize) < BOARD_SIZE);
        Self { file, rank }
    }

    /// 列 (0-7)
    pub fn file(&self) -> u8 {
        self.file
    }

    /// 行 (0-7)
    pub fn rank(&self) -> u8 {
        self.rank
    }

    /// 检查坐标是否在棋盘内
    pub fn is_valid(&self) -> bool {
        (self.file as usize) < BOARD_SIZE && (self.rank as usize) < BOARD_SIZE
    }

    /// 获取偏移后的坐标，越界返回 None
    pub fn offset(&self, df: i8, dr: i8) -> Option<Coord> {
        let file = self.file as i8 + df;
        let rank = self.rank as i8 + dr;
        if (0..BOARD_SIZE as i8).contains(&file) && (0..BOARD_SIZE as i8).contains(&rank) {
            Some(Coord {
                file: file as u8,
                rank: rank as u8,
            })
        } else {
            None
        }
    }

    /// 遍历棋盘上全部 64 个坐标（按行优先，从 a1 开始）
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE as u8)
            .flat_map(|rank| (0..BOARD_SIZE as u8).map(move |file| Coord::new_unchecked(file, rank)))
    }
}
