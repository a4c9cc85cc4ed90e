//! トークンの結果コンテナ
//!
//! このモジュールは、形態素解析の結果として得られるトークンを表現する型を提供します。
//! [`Token`]は[`Worker`]を借用する軽量なビュー、[`TokenBuf`]は所有型の
//! シリアライズ可能なトークンです。

use std::ops::Range;

use serde::Serialize;

use crate::dictionary::{LexType, word_idx::WordIdx};
use crate::tokenizer::worker::Worker;

/// 形態素解析の結果トークン
///
/// このトークンは[`Worker`]への軽量な参照であり、実際のデータは
/// Workerが保持しています。トークンはWorkerが生存している間のみ有効です。
pub struct Token<'w> {
    worker: &'w Worker,
    index: usize,
}

impl<'w> Token<'w> {
    #[inline(always)]
    pub(crate) const fn new(worker: &'w Worker, index: usize) -> Self {
        Self { worker, index }
    }

    /// トークンの文字単位の位置範囲を取得します。
    #[inline(always)]
    pub fn range_char(&self) -> Range<usize> {
        let (end_word, node) = &self.worker.top_nodes[self.index];
        node.start_word..*end_word
    }

    /// トークンのバイト単位の位置範囲を取得します。
    #[inline(always)]
    pub fn range_byte(&self) -> Range<usize> {
        let sent = &self.worker.sent;
        let (end_word, node) = &self.worker.top_nodes[self.index];
        sent.byte_position(node.start_word)..sent.byte_position(*end_word)
    }

    /// トークンの表層形（元のテキスト中の文字列）を取得します。
    #[inline(always)]
    pub fn surface(&self) -> &'w str {
        let sent = &self.worker.sent;
        &sent.raw()[self.range_byte()]
    }

    /// トークンの単語インデックスを取得します。
    #[inline(always)]
    pub fn word_idx(&self) -> WordIdx {
        let (_, node) = &self.worker.top_nodes[self.index];
        node.word_idx()
    }

    /// トークンの素性（品詞などの情報）を取得します。
    ///
    /// 素性の形式は辞書によって異なり、解釈されずにそのまま返されます。
    #[inline(always)]
    pub fn feature(&self) -> &'w str {
        self.worker
            .tokenizer
            .dictionary()
            .word_feature(self.word_idx())
    }

    /// トークンが由来する語彙の種類を取得します。
    #[inline(always)]
    pub fn lex_type(&self) -> LexType {
        self.word_idx().lex_type
    }

    /// 左文脈ID
    #[inline(always)]
    pub fn left_id(&self) -> u16 {
        let (_, node) = &self.worker.top_nodes[self.index];
        node.left_id
    }

    /// 右文脈ID
    #[inline(always)]
    pub fn right_id(&self) -> u16 {
        let (_, node) = &self.worker.top_nodes[self.index];
        node.right_id
    }

    /// トークンノードの単語コストを取得します。
    ///
    /// 値が低いほど出現しやすい単語です。
    #[inline(always)]
    pub fn word_cost(&self) -> i32 {
        self.worker
            .tokenizer
            .dictionary()
            .inner()
            .word_param(self.word_idx())
            .word_cost
    }

    /// 文頭からこのトークンノードまでの累積コストを取得します。
    #[inline(always)]
    pub fn total_cost(&self) -> i32 {
        let (_, node) = &self.worker.top_nodes[self.index];
        node.min_cost
    }

    /// このトークンビューを所有型の[`TokenBuf`]に変換します。
    pub fn to_buf(&self) -> TokenBuf {
        let range_byte = self.range_byte();
        let range_char = self.range_char();
        // Inputs longer than u32::MAX bytes are rejected by Worker::tokenize.
        TokenBuf {
            surface: self.surface().to_string(),
            feature: self.feature().to_string(),
            start: range_byte.start as u32,
            end: range_byte.end as u32,
            start_char: range_char.start as u32,
            end_char: range_char.end as u32,
            lex_type: self.lex_type(),
            left_id: self.left_id(),
            right_id: self.right_id(),
            word_cost: self.word_cost(),
            total_cost: self.total_cost(),
        }
    }
}

impl std::fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("surface", &self.surface())
            .field("range_char", &self.range_char())
            .field("range_byte", &self.range_byte())
            .field("feature", &self.feature())
            .field("lex_type", &self.lex_type())
            .field("word_id", &self.word_idx())
            .field("left_id", &self.left_id())
            .field("right_id", &self.right_id())
            .field("word_cost", &self.word_cost())
            .field("total_cost", &self.total_cost())
            .finish()
    }
}

/// トークンのイテレータ
///
/// 前方および後方からの走査をサポートしています（[`DoubleEndedIterator`]を実装）。
pub struct TokenIter<'w> {
    worker: &'w Worker,
    front: usize,
    back: usize,
}

impl<'w> TokenIter<'w> {
    #[inline(always)]
    pub(crate) fn new(worker: &'w Worker) -> Self {
        let num_tokens = worker.num_tokens();
        Self {
            worker,
            front: 0,
            back: num_tokens,
        }
    }
}

impl<'w> Iterator for TokenIter<'w> {
    type Item = Token<'w>;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            let t = self.worker.token(self.front);
            self.front += 1;
            Some(t)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<'w> DoubleEndedIterator for TokenIter<'w> {
    #[inline(always)]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            self.back -= 1;
            let t = self.worker.token(self.back);
            Some(t)
        } else {
            None
        }
    }
}

impl ExactSizeIterator for TokenIter<'_> {}

/// 所有型の自己完結したトークン
///
/// [`Token`]の所有型版です。解析結果を保存したり、スレッド間で送信したり、
/// JSONとして出力する際に使用します。
///
/// `start`と`end`は入力テキストのUTF-8バイトオフセットです。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBuf {
    /// 表層形
    pub surface: String,

    /// 素性情報（品詞など）
    pub feature: String,

    /// 開始バイト位置
    pub start: u32,

    /// 終了バイト位置（排他的）
    pub end: u32,

    /// 開始文字位置
    pub start_char: u32,

    /// 終了文字位置（排他的）
    pub end_char: u32,

    /// 語彙の種類
    pub lex_type: LexType,

    /// 左文脈ID
    pub left_id: u16,

    /// 右文脈ID
    pub right_id: u16,

    /// 単語コスト
    pub word_cost: i32,

    /// 文頭からの累積コスト
    pub total_cost: i32,
}

impl TokenBuf {
    /// バイト単位の位置範囲
    #[inline(always)]
    pub fn range_byte(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// 文字単位の位置範囲
    #[inline(always)]
    pub fn range_char(&self) -> Range<usize> {
        self.start_char as usize..self.end_char as usize
    }
}

impl<'w> From<Token<'w>> for TokenBuf {
    fn from(token: Token<'w>) -> Self {
        token.to_buf()
    }
}

#[cfg(test)]
mod tests {
    use crate::dictionary::*;
    use crate::tokenizer::*;

    fn tokenizer() -> Tokenizer {
        let lexicon_csv = "自然,0,0,1,sizen
言語,0,0,4,gengo
処理,0,0,3,shori
自然言語,0,0,6,sizengengo
言語処理,0,0,5,gengoshori";
        let matrix_def = "1 1\n0 0 0";
        let char_def = "DEFAULT 0 1 0";
        let unk_def = "DEFAULT,0,0,100,*";

        let dict_inner = SystemDictionaryBuilder::from_readers(
            lexicon_csv.as_bytes(),
            matrix_def.as_bytes(),
            char_def.as_bytes(),
            unk_def.as_bytes(),
        )
        .unwrap();

        let mut buffer = Vec::new();
        dict_inner.write(&mut buffer).unwrap();

        Tokenizer::new(Dictionary::read(buffer.as_slice()).unwrap())
    }

    #[test]
    fn test_iter() {
        let tokenizer = tokenizer();
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("自然言語処理");
        worker.tokenize().unwrap();
        assert_eq!(worker.num_tokens(), 2);

        let mut it = worker.token_iter();
        assert_eq!(it.len(), 2);
        for i in 0..worker.num_tokens() {
            let lhs = worker.token(i);
            let rhs = it.next().unwrap();
            assert_eq!(lhs.surface(), rhs.surface());
        }
        assert!(it.next().is_none());

        let rev: Vec<_> = worker.token_iter().rev().map(|t| t.surface()).collect();
        assert_eq!(rev, vec!["言語処理", "自然"]);
    }

    #[test]
    fn test_to_buf() {
        let tokenizer = tokenizer();
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("自然言語処理");
        worker.tokenize().unwrap();

        let buf = worker.token(1).to_buf();
        assert_eq!(buf.surface, "言語処理");
        assert_eq!(buf.feature, "gengoshori");
        assert_eq!(buf.range_byte(), 6..18);
        assert_eq!(buf.range_char(), 2..6);
        assert_eq!(buf.lex_type, LexType::System);
        assert_eq!(buf.word_cost, 5);
        assert_eq!(buf.total_cost, 6);
    }

    #[test]
    fn test_serialize() {
        let tokenizer = tokenizer();
        let tokens = tokenizer.analyze("自然").unwrap();
        let json = serde_json::to_value(&tokens).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "surface": "自然",
                "feature": "sizen",
                "start": 0,
                "end": 6,
                "start_char": 0,
                "end_char": 2,
                "lex_type": "system",
                "left_id": 0,
                "right_id": 0,
                "word_cost": 1,
                "total_cost": 1,
            }])
        );
    }
}
