//! 辞書の語彙情報を管理するモジュール
//!
//! このモジュールは、単語の表層形、パラメータ、素性情報を管理する
//! 語彙データ構造を提供します。

mod feature;
mod map;
mod param;

use std::io::Read;

use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::LexType;
use crate::dictionary::connector::ConnectorView;
use crate::dictionary::lexicon::feature::WordFeatures;
use crate::dictionary::lexicon::map::WordMap;
use crate::dictionary::lexicon::param::WordParams;
use crate::dictionary::word_idx::WordIdx;
use crate::errors::{MorphError, Result};
use crate::utils::{self, FromU32};

pub use crate::dictionary::lexicon::param::WordParam;

/// システム辞書の語彙
///
/// 表層形の索引、単語パラメータ、素性文字列を単語IDで対応付けて保持します。
/// 単語IDは`lex.csv`での出現順です。
#[derive(Archive, Serialize, Deserialize)]
pub struct Lexicon {
    map: WordMap,
    params: WordParams,
    features: WordFeatures,
}

impl Lexicon {
    /// 入力の先頭から始まる辞書語をすべて列挙します。
    ///
    /// 表層形の短い順、同じ表層形の中では単語IDの順に返します。
    #[inline(always)]
    pub fn common_prefix_iterator<'a>(
        &'a self,
        input: &'a [char],
    ) -> impl Iterator<Item = LexMatch> + 'a {
        self.map
            .common_prefix_iterator(input)
            .map(move |(word_id, end_char)| {
                LexMatch::new(
                    WordIdx::new(LexType::System, word_id),
                    self.params.get(usize::from_u32(word_id)),
                    end_char,
                )
            })
    }

    #[inline(always)]
    pub fn word_param(&self, word_idx: WordIdx) -> WordParam {
        debug_assert_eq!(word_idx.lex_type, LexType::System);
        self.params.get(usize::from_u32(word_idx.word_id))
    }

    #[inline(always)]
    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        debug_assert_eq!(word_idx.lex_type, LexType::System);
        self.features.get(usize::from_u32(word_idx.word_id))
    }

    /// 登録語数
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// 異なり表層形の数
    #[inline(always)]
    pub fn num_surfaces(&self) -> usize {
        self.map.num_keys()
    }

    /// すべての接続IDが接続行列の範囲内にあるかを検査します。
    pub fn verify<C>(&self, conn: &C) -> bool
    where
        C: ConnectorView,
    {
        self.params.iter().all(|p| {
            usize::from(p.left_id) < conn.num_left() && usize::from(p.right_id) < conn.num_right()
        })
    }

    /// 索引、パラメータ、素性の件数が互いに一致するかを検査します。
    pub fn verify_layout(&self) -> bool {
        self.params.len() == self.features.len() && self.map.verify(self.params.len())
    }

    pub fn from_entries(entries: &[RawWordEntry]) -> Result<Self> {
        let map = WordMap::new(entries.iter().map(|e| &e.surface))?;
        let params = WordParams::new(entries.iter().map(|e| e.param));
        let features = WordFeatures::new(entries.iter().map(|e| &e.feature));

        Ok(Self {
            map,
            params,
            features,
        })
    }

    pub fn from_reader<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut buf = String::new();
        rdr.read_to_string(&mut buf)?;

        let entries = Self::parse_csv(&buf, "lex.csv")?;

        Self::from_entries(&entries)
    }

    /// `surface,left_id,right_id,cost[,features...]`形式のCSVを解析します。
    ///
    /// 5列目以降は素性としてカンマで連結したまま保持します。
    /// 表層形が空の行は読み飛ばします。
    ///
    /// # エラー
    ///
    /// 4列に満たない行や、数値列が整数として解釈できない行がある場合にエラーを返します。
    pub(crate) fn parse_csv(text: &str, name: &'static str) -> Result<Vec<RawWordEntry>> {
        let mut entries = vec![];

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let fields = utils::parse_csv_row(line, name)?;
            if fields.len() < 4 {
                let msg = format!("A csv row of lexicon must have four items at least, {line:?}");
                return Err(MorphError::invalid_format(name, msg));
            }
            if fields[0].is_empty() {
                log::warn!("Skipped an empty surface, {line:?}");
                continue;
            }
            let left_id = fields[1].trim().parse()?;
            let right_id = fields[2].trim().parse()?;
            let word_cost = fields[3].trim().parse()?;
            entries.push(RawWordEntry {
                surface: fields[0].clone(),
                param: WordParam::new(left_id, right_id, word_cost),
                feature: fields[4..].join(","),
            });
        }
        Ok(entries)
    }
}

#[derive(Eq, PartialEq, Debug)]
pub struct LexMatch {
    pub word_idx: WordIdx,
    pub word_param: WordParam,
    pub end_char: usize,
}

impl LexMatch {
    #[inline(always)]
    pub const fn new(word_idx: WordIdx, word_param: WordParam, end_char: usize) -> Self {
        Self {
            word_idx,
            word_param,
            end_char,
        }
    }
}

/// CSVから読み込んだ1語分のエントリ
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RawWordEntry {
    pub surface: String,
    pub param: WordParam,
    pub feature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix_iterator() {
        let lexicon = Lexicon {
            map: WordMap::new(["東京", "東京都", "東京", "京都"]).unwrap(),
            params: WordParams::new([
                WordParam::new(1, 2, 3),
                WordParam::new(4, 5, 6),
                WordParam::new(7, 8, 9),
                WordParam::new(10, 11, 12),
            ]),
            features: WordFeatures::default(),
        };
        let input: Vec<_> = "東京都".chars().collect();
        let mut it = lexicon.common_prefix_iterator(&input);
        assert_eq!(
            it.next().unwrap(),
            LexMatch {
                end_char: 2,
                word_idx: WordIdx::new(LexType::System, 0),
                word_param: WordParam::new(1, 2, 3),
            }
        );
        assert_eq!(
            it.next().unwrap(),
            LexMatch {
                end_char: 2,
                word_idx: WordIdx::new(LexType::System, 2),
                word_param: WordParam::new(7, 8, 9),
            }
        );
        assert_eq!(
            it.next().unwrap(),
            LexMatch {
                end_char: 3,
                word_idx: WordIdx::new(LexType::System, 1),
                word_param: WordParam::new(4, 5, 6),
            }
        );
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_parse_csv() {
        let data = "東京,1,2,-300,名詞,固有名詞\n\n京都,3,4,5\n";
        let entries = Lexicon::parse_csv(data, "test.csv").unwrap();
        assert_eq!(
            entries,
            vec![
                RawWordEntry {
                    surface: "東京".to_string(),
                    param: WordParam::new(1, 2, -300),
                    feature: "名詞,固有名詞".to_string(),
                },
                RawWordEntry {
                    surface: "京都".to_string(),
                    param: WordParam::new(3, 4, 5),
                    feature: String::new(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_csv_few_cols() {
        assert!(Lexicon::parse_csv("東京,1,2", "test.csv").is_err());
    }

    #[test]
    fn test_parse_csv_invalid_cost() {
        assert!(Lexicon::parse_csv("東京,1,2,a", "test.csv").is_err());
    }

    #[test]
    fn test_parse_csv_quoted_surface() {
        let entries = Lexicon::parse_csv("\"\"\"\",5,5,10,記号", "test.csv").unwrap();
        assert_eq!(entries[0].surface, "\"");
    }

    #[test]
    fn test_from_reader() {
        let lexicon = Lexicon::from_reader("自然,0,0,1,sizen\n自然,0,0,2,sizen2".as_bytes()).unwrap();
        assert_eq!(lexicon.len(), 2);
        assert_eq!(lexicon.num_surfaces(), 1);
        assert!(lexicon.verify_layout());
        assert_eq!(
            lexicon.word_feature(WordIdx::new(LexType::System, 1)),
            "sizen2"
        );
    }
}
