//! 文字プロパティ定義
//!
//! このモジュールは、`char.def`で定義される文字情報を管理します。
//! 各文字のカテゴリ、グループ化、未知語処理などの属性を保持します。
//!
//! `char.def`は2種類の行から構成されます。
//!
//! ```text
//! # カテゴリ定義: 名前 INVOKE GROUP LENGTH
//! DEFAULT 0 1 0
//! KANJI   0 0 2
//! # 文字範囲: 開始[..終了] 基本カテゴリ [追加カテゴリ...]
//! 0x4E00..0x9FFF KANJI
//! ```
use std::fmt;
use std::io::{BufRead, BufReader, Read};

use hashbrown::HashMap;
use rkyv::{Archive, Deserialize, Serialize};

use crate::common::{DEFAULT_CATEGORY, MAX_CATEGORIES, MAX_UNK_LENGTH};
use crate::errors::{MorphError, Result};

const CATE_IDSET_BITS: usize = 18;
const CATE_IDSET_MASK: u32 = (1 << CATE_IDSET_BITS) - 1;
const BASE_ID_BITS: usize = 8;
const BASE_ID_MASK: u32 = (1 << BASE_ID_BITS) - 1;

/// 1文字分の属性情報
///
/// 32ビットに以下の情報を詰めて保持します。
///
/// | ビット | 内容 |
/// |---|---|
/// | 0..18 | 所属カテゴリIDの集合 |
/// | 18..26 | 基本カテゴリID |
/// | 26 | INVOKE |
/// | 27 | GROUP |
/// | 28..32 | LENGTH |
#[derive(Default, Clone, Copy, Eq, PartialEq, Archive, Serialize, Deserialize)]
pub struct CharInfo(u32);

impl fmt::Debug for CharInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharInfo")
            .field("cate_idset", &self.cate_idset())
            .field("base_id", &self.base_id())
            .field("invoke", &self.invoke())
            .field("group", &self.group())
            .field("length", &self.length())
            .finish()
    }
}

impl CharInfo {
    /// 各属性から`CharInfo`を組み立てます。
    ///
    /// # エラー
    ///
    /// カテゴリIDまたは長さがビット幅に収まらない場合にエラーを返します。
    pub fn new(cate_idset: u32, base_id: u32, invoke: bool, group: bool, length: u32) -> Result<Self> {
        if cate_idset >> CATE_IDSET_BITS != 0 {
            return Err(MorphError::invalid_argument(
                "cate_idset",
                "cate_idset must be represented in 18 bits.",
            ));
        }
        if base_id >> BASE_ID_BITS != 0 {
            return Err(MorphError::invalid_argument(
                "base_id",
                "base_id must be represented in 8 bits.",
            ));
        }
        if length > MAX_UNK_LENGTH {
            return Err(MorphError::invalid_argument(
                "length",
                format!("length must be no more than {MAX_UNK_LENGTH}."),
            ));
        }
        Ok(Self(
            cate_idset
                | (base_id << CATE_IDSET_BITS)
                | (u32::from(invoke) << (CATE_IDSET_BITS + BASE_ID_BITS))
                | (u32::from(group) << (CATE_IDSET_BITS + BASE_ID_BITS + 1))
                | (length << (CATE_IDSET_BITS + BASE_ID_BITS + 2)),
        ))
    }

    #[inline(always)]
    fn with_cate_idset(self, cate_idset: u32) -> Self {
        Self((self.0 & !CATE_IDSET_MASK) | (cate_idset & CATE_IDSET_MASK))
    }

    /// 所属カテゴリIDの集合(ビットセット)
    #[inline(always)]
    pub const fn cate_idset(&self) -> u32 {
        self.0 & CATE_IDSET_MASK
    }

    /// 基本カテゴリID
    #[inline(always)]
    pub const fn base_id(&self) -> u32 {
        (self.0 >> CATE_IDSET_BITS) & BASE_ID_MASK
    }

    /// 辞書に一致する語があっても未知語処理を行うか
    #[inline(always)]
    pub const fn invoke(&self) -> bool {
        (self.0 >> (CATE_IDSET_BITS + BASE_ID_BITS)) & 1 != 0
    }

    /// 同じカテゴリの連続をまとめて1語とするか
    #[inline(always)]
    pub const fn group(&self) -> bool {
        (self.0 >> (CATE_IDSET_BITS + BASE_ID_BITS + 1)) & 1 != 0
    }

    /// 1..=LENGTH文字の未知語を生成する
    #[inline(always)]
    pub const fn length(&self) -> u16 {
        (self.0 >> (CATE_IDSET_BITS + BASE_ID_BITS + 2)) as u16
    }
}

/// 文字からカテゴリ情報への対応表
///
/// 定義された最大コードポイントまでの密な表と、範囲外の文字に割り当てる
/// `DEFAULT`カテゴリの情報を保持します。
#[derive(Archive, Serialize, Deserialize)]
pub struct CharProperty {
    chr2inf: Vec<CharInfo>,
    default_info: CharInfo,
    categories: Vec<String>,
}

impl CharProperty {
    /// 文字の属性情報を返します。
    #[inline(always)]
    pub fn char_info(&self, c: char) -> CharInfo {
        self.chr2inf
            .get(c as usize)
            .copied()
            .unwrap_or(self.default_info)
    }

    /// カテゴリ数
    #[inline(always)]
    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    /// カテゴリ名からIDを引きます。
    pub fn cate_id(&self, category: &str) -> Option<u32> {
        self.categories
            .iter()
            .position(|c| c == category)
            .and_then(|id| u32::try_from(id).ok())
    }

    /// IDからカテゴリ名を引きます。
    pub fn cate_str(&self, cate_id: u32) -> Option<&str> {
        self.categories
            .get(usize::try_from(cate_id).ok()?)
            .map(|s| s.as_str())
    }

    /// すべての文字情報が定義済みのカテゴリだけを参照しているかを検査します。
    pub fn verify(&self) -> bool {
        let Ok(num_categories) = u32::try_from(self.categories.len()) else {
            return false;
        };
        let valid = |info: &CharInfo| {
            info.base_id() < num_categories && info.cate_idset() >> num_categories == 0
        };
        valid(&self.default_info) && self.chr2inf.iter().all(valid)
    }

    /// `char.def`形式のリーダーから文字プロパティを構築します。
    ///
    /// 後に現れた範囲定義が先の定義を上書きします。どの範囲にも含まれない文字は
    /// `DEFAULT`カテゴリに割り当てられます。
    ///
    /// # エラー
    ///
    /// 以下の場合にエラーを返します:
    /// - 行の形式が不正な場合
    /// - 未定義のカテゴリが範囲定義で参照された場合
    /// - `DEFAULT`カテゴリが定義されていない場合
    /// - カテゴリ数が18を超える場合
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut cate2info: HashMap<String, CharInfo> = HashMap::new();
        let mut categories: Vec<String> = vec![];
        let mut ranges: Vec<(u32, u32, Vec<String>)> = vec![];

        for (i, line) in BufReader::new(rdr).lines().enumerate() {
            let line = line?;
            let line = strip_comment(&line);
            if line.is_empty() {
                continue;
            }
            if line.starts_with("0x") {
                ranges.push(parse_char_range(line, i + 1)?);
            } else {
                let (name, info) = parse_char_category(line, categories.len(), i + 1)?;
                if cate2info.contains_key(&name) {
                    return Err(MorphError::invalid_format(
                        "char.def",
                        format!("Category {name} is defined twice (line {}).", i + 1),
                    ));
                }
                if categories.len() == MAX_CATEGORIES {
                    return Err(MorphError::invalid_format(
                        "char.def",
                        format!("The number of categories must be no more than {MAX_CATEGORIES}."),
                    ));
                }
                cate2info.insert(name.clone(), info);
                categories.push(name);
            }
        }

        let default_info = *cate2info.get(DEFAULT_CATEGORY).ok_or_else(|| {
            MorphError::invalid_format("char.def", "DEFAULT category must be defined.")
        })?;

        let max_code = ranges.iter().map(|&(_, end, _)| end).max().unwrap_or(0);
        let mut chr2inf = vec![default_info; usize::try_from(max_code)? + 1];

        for (start, end, names) in &ranges {
            let mut cate_idset = 0;
            for name in names {
                let info = cate2info.get(name).ok_or_else(|| {
                    MorphError::invalid_format(
                        "char.def",
                        format!("Undefined category {name} is referenced."),
                    )
                })?;
                cate_idset |= info.cate_idset();
            }
            // The first category decides the behavior of unknown words.
            let base = cate2info[&names[0]].with_cate_idset(cate_idset);
            for code in *start..=*end {
                chr2inf[usize::try_from(code)?] = base;
            }
        }

        Ok(Self {
            chr2inf,
            default_info,
            categories,
        })
    }
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("").trim()
}

fn parse_char_category(line: &str, cate_id: usize, lineno: usize) -> Result<(String, CharInfo)> {
    let cols: Vec<_> = line.split_whitespace().collect();
    if cols.len() < 4 {
        return Err(MorphError::invalid_format(
            "char.def",
            format!("A category definition must have four items, line {lineno}: {line:?}"),
        ));
    }
    let invoke = parse_flag(cols[1], lineno)?;
    let group = parse_flag(cols[2], lineno)?;
    let length: u32 = cols[3].parse()?;
    let cate_id = u32::try_from(cate_id)?;
    let info = CharInfo::new(1 << cate_id, cate_id, invoke, group, length)?;
    Ok((cols[0].to_string(), info))
}

fn parse_flag(col: &str, lineno: usize) -> Result<bool> {
    match col {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(MorphError::invalid_format(
            "char.def",
            format!("A flag must be 0 or 1, line {lineno}: {col:?}"),
        )),
    }
}

fn parse_char_range(line: &str, lineno: usize) -> Result<(u32, u32, Vec<String>)> {
    let cols: Vec<_> = line.split_whitespace().collect();
    if cols.len() < 2 {
        return Err(MorphError::invalid_format(
            "char.def",
            format!("A range definition must have a category, line {lineno}: {line:?}"),
        ));
    }
    let (start, end) = match cols[0].split_once("..") {
        Some((s, e)) => (parse_hex(s)?, parse_hex(e)?),
        None => {
            let c = parse_hex(cols[0])?;
            (c, c)
        }
    };
    if start > end || end > u32::from(char::MAX) {
        return Err(MorphError::invalid_format(
            "char.def",
            format!("Invalid code point range, line {lineno}: {:?}", cols[0]),
        ));
    }
    let names = cols[1..].iter().map(|s| s.to_string()).collect();
    Ok((start, end, names))
}

fn parse_hex(s: &str) -> Result<u32> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    Ok(u32::from_str_radix(digits, 16)?)
}
