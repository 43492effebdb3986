//! 位置记号
//!
//! 两个字符：列字母 `a`-`h` + 行数字 `1`-`8`，例如 `e2`。
//! `a1` 对应 `(0, 0)`，`h8` 对应 `(7, 7)`。

use std::fmt;
use std::str::FromStr;

use crate::error::ChessError;
use crate::piece::Coord;

/// 位置记号
pub struct Notation;

impl Notation {
    /// 解析位置记号，例如 `"a1"` -> `(0, 0)`
    pub fn parse(input: &str) -> Result<Coord, ChessError> {
        let invalid = || ChessError::InvalidNotation {
            input: input.to_string(),
        };

        let &[file, rank] = input.as_bytes() else {
            return Err(invalid());
        };
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(invalid());
        }

        Ok(Coord::new_unchecked(file - b'a', rank - b'1'))
    }

    /// 格式化为位置记号
    pub fn format(coord: Coord) -> String {
        let file = (b'a' + coord.file()) as char;
        let rank = (b'1' + coord.rank()) as char;
        format!("{}{}", file, rank)
    }
}

impl FromStr for Coord {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Notation::parse(s)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Notation::format(*self))
    }
}
