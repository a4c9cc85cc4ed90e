//! 入力テキストの内部表現を提供するモジュール
//!
//! 入力文字列を文字単位に分割し、各文字の属性情報、文字位置からバイト位置への
//! 対応、同じカテゴリの文字の連続長を計算・保持します。

use crate::dictionary::character::{CharInfo, CharProperty};

/// 入力テキストの内部表現を保持する構造体
///
/// # フィールド
///
/// * `input` - 元の入力文字列
/// * `chars` - 入力文字列を文字単位に分割した配列
/// * `c2b` - 文字位置からバイト位置へのマッピング配列(末尾に入力長を含む)
/// * `cinfos` - 各文字の属性情報を保持する配列
/// * `groupable` - 各文字位置から同じカテゴリが連続する文字数
#[derive(Default, Clone, Debug)]
pub struct Sentence {
    input: String,
    chars: Vec<char>,
    c2b: Vec<usize>,
    cinfos: Vec<CharInfo>,
    groupable: Vec<usize>,
}

impl Sentence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内部状態をクリアします
    #[inline(always)]
    pub fn clear(&mut self) {
        self.input.clear();
        self.chars.clear();
        self.c2b.clear();
        self.cinfos.clear();
        self.groupable.clear();
    }

    /// 入力文字列を設定します
    ///
    /// この時点では文字列の解析は行われません。解析を行うには [`compile`]
    /// を呼び出す必要があります。
    ///
    /// [`compile`]: Self::compile
    pub fn set_sentence<S>(&mut self, input: S)
    where
        S: AsRef<str>,
    {
        self.clear();
        self.input.push_str(input.as_ref());
    }

    /// 入力文字列を解析し、内部データ構造を構築します
    ///
    /// 1. 文字配列とバイト位置マッピングの計算
    /// 2. 各文字の属性情報の計算
    /// 3. 同じカテゴリの連続長の計算
    pub fn compile(&mut self, char_prop: &CharProperty) {
        self.compute_basic();
        self.compute_categories(char_prop);
        self.compute_groupable();
    }

    fn compute_basic(&mut self) {
        for (bi, ch) in self.input.char_indices() {
            self.chars.push(ch);
            self.c2b.push(bi);
        }
        self.c2b.push(self.input.len());
    }

    fn compute_categories(&mut self, char_prop: &CharProperty) {
        self.cinfos.reserve(self.chars.len());
        for &c in &self.chars {
            self.cinfos.push(char_prop.char_info(c));
        }
    }

    /// 隣接する文字が共通のカテゴリに属する場合に連続しているとみなし、
    /// 各位置から後方へ続く連続長を計算します。
    fn compute_groupable(&mut self) {
        debug_assert_eq!(self.chars.len(), self.cinfos.len());

        self.groupable.resize(self.chars.len(), 1);
        let Some(last) = self.cinfos.last() else {
            return;
        };
        let mut rhs = last.cate_idset();

        for i in (1..self.chars.len()).rev() {
            let lhs = self.cinfos[i - 1].cate_idset();
            if (lhs & rhs) != 0 {
                self.groupable[i - 1] = self.groupable[i] + 1;
            }
            rhs = lhs;
        }
    }

    /// 元の入力文字列
    #[inline(always)]
    pub fn raw(&self) -> &str {
        &self.input
    }

    #[inline(always)]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// 文字数(バイト数ではない)
    #[inline(always)]
    pub fn len_char(&self) -> usize {
        self.chars.len()
    }

    /// 文字位置に対応するバイト位置
    #[inline(always)]
    pub fn byte_position(&self, pos_char: usize) -> usize {
        self.c2b[pos_char]
    }

    #[inline(always)]
    pub fn char_info(&self, pos_char: usize) -> CharInfo {
        self.cinfos[pos_char]
    }

    /// 指定された位置から同じカテゴリの文字が連続している数
    #[inline(always)]
    pub fn groupable(&self, pos_char: usize) -> usize {
        self.groupable[pos_char]
    }
}
