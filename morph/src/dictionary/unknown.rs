//! 未知語処理
//!
//! このモジュールは、`unk.def`で定義される未知語エントリを管理し、
//! 辞書に登録されていない文字列に対してラティスのノードを生成します。
//!
//! `unk.def`に行を持たないカテゴリには`DEFAULT`カテゴリのエントリが
//! 割り当てられます。したがって、どの文字位置からでも少なくとも1つの
//! 未知語ノードを生成できます。
use std::io::Read;

use rkyv::{Archive, Deserialize, Serialize};

use crate::common::DEFAULT_CATEGORY;
use crate::dictionary::LexType;
use crate::dictionary::character::{CharInfo, CharProperty};
use crate::dictionary::connector::ConnectorView;
use crate::dictionary::lexicon::{Lexicon, WordParam};
use crate::dictionary::word_idx::WordIdx;
use crate::errors::{MorphError, Result};
use crate::sentence::Sentence;
use crate::utils::FromU32;

/// 未知語ハンドラが生成する単語候補
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct UnkWord {
    start_char: usize,
    end_char: usize,
    word_param: WordParam,
    word_id: u32,
}

impl UnkWord {
    #[inline(always)]
    pub const fn start_char(&self) -> usize {
        self.start_char
    }

    #[inline(always)]
    pub const fn end_char(&self) -> usize {
        self.end_char
    }

    #[inline(always)]
    pub const fn word_param(&self) -> WordParam {
        self.word_param
    }

    #[inline(always)]
    pub const fn word_idx(&self) -> WordIdx {
        WordIdx::new(LexType::Unknown, self.word_id)
    }
}

/// `unk.def`の1行分
#[derive(Default, Debug, Clone, Archive, Serialize, Deserialize, Eq, PartialEq)]
pub struct UnkEntry {
    pub cate_id: u32,
    pub left_id: u16,
    pub right_id: u16,
    pub word_cost: i32,
    pub feature: String,
}

/// カテゴリごとの未知語エントリ
///
/// `entries[offsets[c]..offsets[c + 1]]`がカテゴリ`c`のエントリです。
#[derive(Archive, Serialize, Deserialize)]
pub struct UnkHandler {
    offsets: Vec<u32>,
    entries: Vec<UnkEntry>,
}

impl UnkHandler {
    /// `start_char`から始まる未知語を生成し、各候補について`f`を呼び出します。
    ///
    /// 1. 辞書語が一致し、かつ文字カテゴリのINVOKEが無効なら何もしません。
    /// 2. GROUPが有効なら、同じカテゴリが連続する範囲全体を1語とします
    ///    (`max_grouping_len`を超える場合は除く)。
    /// 3. 1からLENGTH文字までの候補を生成します。
    /// 4. ここまでで何も生成されていなければ1文字の候補を生成します。
    ///
    /// 各候補に対し、カテゴリのすべてのエントリが順に渡されます。
    pub fn gen_unk_words<F>(
        &self,
        sent: &Sentence,
        start_char: usize,
        mut has_matched: bool,
        max_grouping_len: Option<usize>,
        mut f: F,
    ) where
        F: FnMut(UnkWord),
    {
        let cinfo = sent.char_info(start_char);
        if has_matched && !cinfo.invoke() {
            return;
        }

        let mut grouped = false;
        let groupable = sent.groupable(start_char);

        if cinfo.group() {
            grouped = true;
            if max_grouping_len.is_none_or(|max| groupable <= max) {
                self.scan_entries(start_char, start_char + groupable, cinfo, &mut f);
                has_matched = true;
            }
        }

        for i in 1..=usize::from(cinfo.length()) {
            if groupable < i {
                break;
            }
            if grouped && i == groupable {
                continue;
            }
            self.scan_entries(start_char, start_char + i, cinfo, &mut f);
            has_matched = true;
        }

        if !has_matched {
            self.scan_entries(start_char, start_char + 1, cinfo, &mut f);
        }
    }

    #[inline(always)]
    fn scan_entries<F>(&self, start_char: usize, end_char: usize, cinfo: CharInfo, f: &mut F)
    where
        F: FnMut(UnkWord),
    {
        let cate_id = usize::from_u32(cinfo.base_id());
        let start = usize::from_u32(self.offsets[cate_id]);
        let end = usize::from_u32(self.offsets[cate_id + 1]);
        for word_id in start..end {
            let e = &self.entries[word_id];
            f(UnkWord {
                start_char,
                end_char,
                word_param: WordParam::new(e.left_id, e.right_id, e.word_cost),
                word_id: word_id as u32,
            });
        }
    }

    #[inline(always)]
    pub fn word_param(&self, word_idx: WordIdx) -> WordParam {
        debug_assert_eq!(word_idx.lex_type, LexType::Unknown);
        let e = &self.entries[usize::from_u32(word_idx.word_id)];
        WordParam::new(e.left_id, e.right_id, e.word_cost)
    }

    #[inline(always)]
    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        debug_assert_eq!(word_idx.lex_type, LexType::Unknown);
        &self.entries[usize::from_u32(word_idx.word_id)].feature
    }

    /// 未知語エントリの総数
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// すべての接続IDが接続行列の範囲内にあるかを検査します。
    pub fn verify<C>(&self, conn: &C) -> bool
    where
        C: ConnectorView,
    {
        self.entries.iter().all(|e| {
            usize::from(e.left_id) < conn.num_left() && usize::from(e.right_id) < conn.num_right()
        })
    }

    /// すべてのカテゴリが1つ以上のエントリを持つかを検査します。
    pub fn verify_layout(&self, num_categories: usize) -> bool {
        if self.offsets.len() != num_categories + 1 || self.offsets.first() != Some(&0) {
            return false;
        }
        if self.offsets.last().map(|&o| usize::from_u32(o)) != Some(self.entries.len()) {
            return false;
        }
        self.offsets.windows(2).enumerate().all(|(cate_id, w)| {
            w[0] < w[1]
                && self.entries[usize::from_u32(w[0])..usize::from_u32(w[1])]
                    .iter()
                    .all(|e| usize::from_u32(e.cate_id) == cate_id)
        })
    }

    /// `unk.def`形式のリーダーから未知語ハンドラを構築します。
    ///
    /// # エラー
    ///
    /// 以下の場合にエラーを返します:
    /// - 行の形式が不正な場合
    /// - `char.def`に存在しないカテゴリが参照された場合
    /// - `DEFAULT`カテゴリのエントリが1つもない場合
    pub fn from_reader<R>(mut rdr: R, char_prop: &CharProperty) -> Result<Self>
    where
        R: Read,
    {
        let mut buf = String::new();
        rdr.read_to_string(&mut buf)?;

        let parsed = Lexicon::parse_csv(&buf, "unk.def")?;
        let mut map = vec![vec![]; char_prop.num_categories()];
        for item in parsed {
            let cate_id = char_prop.cate_id(&item.surface).ok_or_else(|| {
                let msg = format!("Undefined category: {}", item.surface);
                MorphError::invalid_format("unk.def", msg)
            })?;
            map[usize::from_u32(cate_id)].push(UnkEntry {
                cate_id,
                left_id: item.param.left_id,
                right_id: item.param.right_id,
                word_cost: item.param.word_cost,
                feature: item.feature,
            });
        }

        let default_id = char_prop
            .cate_id(DEFAULT_CATEGORY)
            .map(usize::from_u32)
            .ok_or_else(|| {
                MorphError::invalid_format("char.def", "DEFAULT category must be defined.")
            })?;
        if map[default_id].is_empty() {
            return Err(MorphError::invalid_format(
                "unk.def",
                "DEFAULT category must have at least one entry.",
            ));
        }
        let default_entries = map[default_id].clone();
        for (cate_id, entries) in map.iter_mut().enumerate() {
            if entries.is_empty() {
                log::debug!(
                    "Category {} has no unknown word entries; DEFAULT entries are used.",
                    char_prop.cate_str(u32::try_from(cate_id)?).unwrap_or("?"),
                );
                for e in &default_entries {
                    entries.push(UnkEntry {
                        cate_id: u32::try_from(cate_id)?,
                        ..e.clone()
                    });
                }
            }
        }

        let mut offsets = vec![0];
        let mut entries = vec![];
        for mut v in map {
            entries.append(&mut v);
            offsets.push(u32::try_from(entries.len())?);
        }
        Ok(Self { offsets, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAR_DEF: &str = "\
DEFAULT 0 1 0
SPACE 0 1 0
ALPHA 1 1 0
KANJI 0 0 2
NUMERIC 1 1 3
0x0020 SPACE
0x0041..0x005A ALPHA
0x0030..0x0039 NUMERIC
0x4E00..0x9FFF KANJI
";

    const UNK_DEF: &str = "\
DEFAULT,5,6,-1000,記号,一般
ALPHA,1,2,100,名詞,英字
ALPHA,3,4,200,名詞,英字2
KANJI,7,8,300,名詞,漢字
NUMERIC,9,9,10,名詞,数
";

    fn handler() -> (CharProperty, UnkHandler) {
        let prop = CharProperty::from_reader(CHAR_DEF.as_bytes()).unwrap();
        let unk = UnkHandler::from_reader(UNK_DEF.as_bytes(), &prop).unwrap();
        (prop, unk)
    }

    fn gen_words(
        prop: &CharProperty,
        unk: &UnkHandler,
        text: &str,
        start: usize,
        matched: bool,
    ) -> Vec<(usize, usize, u32)> {
        let mut sent = Sentence::new();
        sent.set_sentence(text);
        sent.compile(prop);
        let mut words = vec![];
        unk.gen_unk_words(&sent, start, matched, None, |w| {
            words.push((w.start_char(), w.end_char(), w.word_idx().word_id));
        });
        words
    }

    #[test]
    fn test_layout() {
        let (prop, unk) = handler();
        assert!(unk.verify_layout(prop.num_categories()));
        // SPACE has no rows and borrows DEFAULT.
        assert_eq!(unk.len(), 6);
        assert_eq!(unk.word_feature(WordIdx::new(LexType::Unknown, 1)), "記号,一般");
    }

    #[test]
    fn test_group() {
        let (prop, unk) = handler();
        // ALPHA: group only, two entries.
        assert_eq!(gen_words(&prop, &unk, "ABC1", 0, false), vec![(0, 3, 2), (0, 3, 3)]);
    }

    #[test]
    fn test_length() {
        let (prop, unk) = handler();
        // KANJI: no group, length 2.
        assert_eq!(gen_words(&prop, &unk, "漢字語", 0, false), vec![(0, 1, 4), (0, 2, 4)]);
        assert_eq!(gen_words(&prop, &unk, "漢字語", 2, false), vec![(2, 3, 4)]);
    }

    #[test]
    fn test_group_and_length() {
        let (prop, unk) = handler();
        // NUMERIC: group and length 3; the grouped span is not duplicated.
        assert_eq!(
            gen_words(&prop, &unk, "12", 0, false),
            vec![(0, 2, 5), (0, 1, 5)]
        );
    }

    #[test]
    fn test_invoke() {
        let (prop, unk) = handler();
        assert!(gen_words(&prop, &unk, "漢字", 0, true).is_empty());
        assert!(!gen_words(&prop, &unk, "12", 0, true).is_empty());
    }

    #[test]
    fn test_default_always_produces() {
        let (prop, unk) = handler();
        assert_eq!(gen_words(&prop, &unk, "😀", 0, false), vec![(0, 1, 0)]);
        assert_eq!(gen_words(&prop, &unk, "あい", 0, false), vec![(0, 2, 0)]);
    }

    #[test]
    fn test_max_grouping_len() {
        let (prop, unk) = handler();
        let mut sent = Sentence::new();
        sent.set_sentence("ABCDE");
        sent.compile(&prop);
        let mut words = vec![];
        unk.gen_unk_words(&sent, 0, false, Some(3), |w| words.push(w.end_char()));
        // The group is too long and LENGTH is 0, so a single character is generated.
        assert_eq!(words, vec![1, 1]);
    }

    #[test]
    fn test_missing_default_entries() {
        let prop = CharProperty::from_reader(CHAR_DEF.as_bytes()).unwrap();
        assert!(UnkHandler::from_reader("ALPHA,1,2,100,名詞".as_bytes(), &prop).is_err());
    }

    #[test]
    fn test_undefined_category() {
        let prop = CharProperty::from_reader(CHAR_DEF.as_bytes()).unwrap();
        assert!(UnkHandler::from_reader("DEFAULT,0,0,0\nHIRAGANA,0,0,0".as_bytes(), &prop).is_err());
    }
}
