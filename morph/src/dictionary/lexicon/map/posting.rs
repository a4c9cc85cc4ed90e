//! ポスティングリスト
//!
//! このモジュールは、単語IDのポスティングリストを管理します。

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::Result;
use crate::utils::FromU32;

#[derive(Archive, Serialize, Deserialize)]
pub struct Postings {
    // Sets of ids are stored by interleaving their length and values.
    data: Vec<u32>,
}

impl Postings {
    /// 格納している`u32`の総数
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `i`番目から始まるIDの集合を返します。範囲外の参照では`None`を返します。
    pub fn checked_ids(&self, i: usize) -> Option<&[u32]> {
        let len = usize::from_u32(*self.data.get(i)?);
        self.data.get(i + 1..(i + 1).checked_add(len)?)
    }
}

#[derive(Default)]
pub struct PostingsBuilder {
    data: Vec<u32>,
}

impl PostingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn push(&mut self, ids: &[u32]) -> Result<usize> {
        let offset = self.data.len();
        self.data.push(ids.len().try_into()?);
        self.data.extend_from_slice(ids);
        Ok(offset)
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn build(self) -> Postings {
        Postings { data: self.data }
    }
}
