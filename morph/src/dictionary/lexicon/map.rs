//! 表層形の索引
//!
//! 表層形をダブル配列トライで引き、同じ表層形を持つ語の単語IDを
//! ポスティングリストから列挙します。

pub mod posting;
pub mod trie;

use std::collections::BTreeMap;

use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::lexicon::map::posting::{Postings, PostingsBuilder};
use crate::dictionary::lexicon::map::trie::Trie;
use crate::errors::Result;
use crate::utils::FromU32;

#[derive(Archive, Serialize, Deserialize)]
pub struct WordMap {
    trie: Trie,
    postings: Postings,
    // Posting offsets in byte order of their surfaces.
    offsets: Vec<u32>,
}

impl WordMap {
    pub fn new<I, W>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let mut b = WordMapBuilder::new();
        for (i, w) in words.into_iter().enumerate() {
            b.add_record(w.as_ref().to_string(), u32::try_from(i)?);
        }
        b.build()
    }

    /// 入力の先頭から一致するすべての語を`(word_id, end_char)`の形で列挙します。
    ///
    /// 短い表層形から順に、同じ表層形の中では登録順に返します。
    #[inline(always)]
    pub fn common_prefix_iterator<'a>(
        &'a self,
        input: &'a [char],
    ) -> impl Iterator<Item = (u32, usize)> + 'a {
        self.trie.common_prefix_iterator(input).flat_map(move |e| {
            self.postings
                .checked_ids(usize::from_u32(e.value))
                .unwrap_or_default()
                .iter()
                .map(move |&word_id| (word_id, e.end_char))
        })
    }

    /// 異なり表層形の数
    #[inline(always)]
    pub fn num_keys(&self) -> usize {
        self.offsets.len()
    }

    /// 索引が`num_words`語の語彙と矛盾しないかを検査します。
    ///
    /// ポスティングリストが隙間なく並び、各単語IDがちょうど一度ずつ現れることを確かめます。
    pub fn verify(&self, num_words: usize) -> bool {
        let mut seen = vec![false; num_words];
        let mut next = 0;
        for &offset in &self.offsets {
            let offset = usize::from_u32(offset);
            if offset != next {
                return false;
            }
            let Some(ids) = self.postings.checked_ids(offset) else {
                return false;
            };
            if ids.is_empty() {
                return false;
            }
            for &id in ids {
                match seen.get_mut(usize::from_u32(id)) {
                    Some(s) if !*s => *s = true,
                    _ => return false,
                }
            }
            next = offset + 1 + ids.len();
        }
        next == self.postings.len() && seen.iter().all(|&s| s)
    }
}

#[derive(Default)]
pub struct WordMapBuilder {
    map: BTreeMap<String, Vec<u32>>,
}

impl WordMapBuilder {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn add_record(&mut self, word: String, id: u32) {
        self.map.entry(word).or_default().push(id);
    }

    pub fn build(self) -> Result<WordMap> {
        let mut records = Vec::with_capacity(self.map.len());
        let mut offsets = Vec::with_capacity(self.map.len());
        let mut builder = PostingsBuilder::new();
        for (word, ids) in self.map {
            let offset = u32::try_from(builder.push(&ids)?)?;
            offsets.push(offset);
            records.push((word, offset));
        }
        Ok(WordMap {
            trie: Trie::from_records(&records)?,
            postings: builder.build(),
            offsets,
        })
    }
}
