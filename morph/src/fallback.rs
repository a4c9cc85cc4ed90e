//! 辞書なしで動作する簡易分割器
//!
//! 辞書が読み込めない場合に使われます。空白で区切り、句読点・括弧の連続は
//! それ自体を1つの区切りとして残します。

use std::sync::LazyLock;

use regex::Regex;

static SEGMENT_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([。、！？!?．，,.「」『』（）()・…]+)|\s+").unwrap());

/// 正規表現による簡易分割器
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackTokenizer;

impl FallbackTokenizer {
    pub const fn new() -> Self {
        Self
    }

    /// テキストを分割します。
    ///
    /// 空白の連続は捨てられ、句読点の連続は独立した要素になります。
    /// 空の要素は含まれません。
    ///
    /// ```
    /// use readmaker_morph::fallback::FallbackTokenizer;
    ///
    /// let words = FallbackTokenizer::new().split("今日は 良い天気です。");
    /// assert_eq!(words, vec!["今日は", "良い天気です", "。"]);
    /// ```
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut words = vec![];
        let mut last = 0;
        for caps in SEGMENT_DELIMITER.captures_iter(text) {
            let Some(delim) = caps.get(0) else {
                continue;
            };
            push_segment(&mut words, &text[last..delim.start()]);
            if let Some(punct) = caps.get(1) {
                push_segment(&mut words, punct.as_str());
            }
            last = delim.end();
        }
        push_segment(&mut words, &text[last..]);
        words
    }
}

#[inline(always)]
fn push_segment(words: &mut Vec<String>, segment: &str) {
    if !segment.is_empty() {
        words.push(segment.to_string());
    }
}
