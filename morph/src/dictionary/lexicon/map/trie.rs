//! ダブル配列トライ
//!
//! 表層形からポスティングリストの位置を引くための索引です。

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{MorphError, Result};

#[derive(Archive, Serialize, Deserialize)]
pub struct Trie {
    da: crawdad_rkyv::Trie,
}

impl Trie {
    /// `(表層形, 値)`の組からトライを構築します。
    ///
    /// 同じ組を同じ順で与えれば、同じバイト列にシリアライズされます。
    pub fn from_records<K>(records: &[(K, u32)]) -> Result<Self>
    where
        K: AsRef<str>,
    {
        let da = crawdad_rkyv::Trie::from_records(records.iter().map(|(k, v)| (k, *v)))
            .map_err(|e| MorphError::invalid_argument("records", e.to_string()))?;
        Ok(Self { da })
    }

    /// 入力の先頭に一致する表層形を短い順に列挙します。
    #[inline(always)]
    pub fn common_prefix_iterator<'a>(
        &'a self,
        input: &'a [char],
    ) -> impl Iterator<Item = TrieMatch> + 'a {
        self.da
            .common_prefix_search(input.iter().copied())
            .map(|(value, end_char)| TrieMatch { value, end_char })
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct TrieMatch {
    /// ポスティングリストの位置
    pub value: u32,
    /// 一致した表層形の終端（文字単位）
    pub end_char: usize,
}
