//! 行列ベースのコネクター実装
//!
//! このモジュールは、接続コストを行列として保持し、
//! 高速なルックアップを提供する行列ベースのコネクターを実装します。

use std::io::{BufRead, BufReader, Read};

use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::connector::{ConnectorCost, ConnectorView};
use crate::errors::{MorphError, Result};
use crate::utils::FromU32;

/// `matrix.def`の内容を保持する接続コスト行列
///
/// コストは`left_id * num_right + right_id`の位置に格納されます。
#[derive(Archive, Serialize, Deserialize)]
pub struct MatrixConnector {
    data: Vec<i32>,
    num_right: u32,
    num_left: u32,
}

impl MatrixConnector {
    /// 行列を直接生成します。
    ///
    /// # エラー
    ///
    /// `data`の長さが`num_right * num_left`と一致しない場合にエラーを返します。
    pub fn new(data: Vec<i32>, num_right: usize, num_left: usize) -> Result<Self> {
        if data.len() != num_right * num_left {
            return Err(MorphError::invalid_argument(
                "data",
                "Matrix data length must be num_right * num_left.",
            ));
        }
        Ok(Self {
            data,
            num_right: u32::try_from(num_right)?,
            num_left: u32::try_from(num_left)?,
        })
    }

    /// `matrix.def`形式のリーダーから行列を構築します。
    ///
    /// 1行目は`num_right num_left`のヘッダ、以降は`right_id left_id cost`の行です。
    /// 記載のない組み合わせのコストは0になります。
    ///
    /// # エラー
    ///
    /// ヘッダや行の形式が不正な場合、またはIDがヘッダの範囲外の場合にエラーを返します。
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut lines = BufReader::new(rdr).lines();
        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => {
                    return Err(MorphError::invalid_format(
                        "matrix.def",
                        "The header line is missing.",
                    ));
                }
            }
        };
        let (num_right, num_left) = Self::parse_header(&header)?;
        if num_right == 0 || num_left == 0 {
            return Err(MorphError::invalid_format(
                "matrix.def",
                "The matrix dimensions must be positive.",
            ));
        }
        let mut data = vec![0; num_right * num_left];
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (right_id, left_id, cost) = Self::parse_body(&line)?;
            if num_right <= right_id || num_left <= left_id {
                return Err(MorphError::invalid_format(
                    "matrix.def",
                    format!("Connection ids are out of range: {line:?}"),
                ));
            }
            data[left_id * num_right + right_id] = cost;
        }
        Self::new(data, num_right, num_left)
    }

    fn parse_header(line: &str) -> Result<(usize, usize)> {
        let cols: Vec<_> = line.split_whitespace().collect();
        if cols.len() != 2 {
            let msg = format!("The header must consists of two integers, {line:?}");
            Err(MorphError::invalid_format("matrix.def", msg))
        } else {
            Ok((cols[0].parse()?, cols[1].parse()?))
        }
    }

    fn parse_body(line: &str) -> Result<(usize, usize, i32)> {
        let cols: Vec<_> = line.split_whitespace().collect();
        if cols.len() != 3 {
            let msg = format!("A line must consists of three integers, {line:?}");
            Err(MorphError::invalid_format("matrix.def", msg))
        } else {
            Ok((cols[0].parse()?, cols[1].parse()?, cols[2].parse()?))
        }
    }

    /// 行列データの長さ
    #[inline(always)]
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    fn index(&self, right_id: u16, left_id: u16) -> usize {
        usize::from(left_id) * usize::from_u32(self.num_right) + usize::from(right_id)
    }
}

impl ConnectorView for MatrixConnector {
    #[inline(always)]
    fn num_left(&self) -> usize {
        usize::from_u32(self.num_left)
    }

    #[inline(always)]
    fn num_right(&self) -> usize {
        usize::from_u32(self.num_right)
    }
}

impl ConnectorCost for MatrixConnector {
    #[inline(always)]
    fn cost(&self, right_id: u16, left_id: u16) -> i32 {
        self.data[self.index(right_id, left_id)]
    }
}
