//! 単語のパラメータ情報
//!
//! このモジュールは、単語の接続IDとコストなどのパラメータを管理します。

use rkyv::{Archive, Deserialize, Serialize};

/// 単語ごとの接続IDと生起コスト
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Archive, Serialize, Deserialize)]
pub struct WordParam {
    /// 左接続ID
    pub left_id: u16,
    /// 右接続ID
    pub right_id: u16,
    /// 生起コスト(小さいほど好まれる)
    pub word_cost: i32,
}

impl WordParam {
    #[inline(always)]
    pub const fn new(left_id: u16, right_id: u16, word_cost: i32) -> Self {
        Self {
            left_id,
            right_id,
            word_cost,
        }
    }
}

#[derive(Archive, Serialize, Deserialize)]
pub struct WordParams {
    params: Vec<WordParam>,
}

impl WordParams {
    pub fn new<I>(params: I) -> Self
    where
        I: IntoIterator<Item = WordParam>,
    {
        Self {
            params: params.into_iter().collect(),
        }
    }

    #[inline(always)]
    pub fn get(&self, word_id: usize) -> WordParam {
        self.params[word_id]
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordParam> {
        self.params.iter()
    }
}
