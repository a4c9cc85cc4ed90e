//! Viterbiアルゴリズムに基づくトークナイザー。
//!
//! このモジュールは、日本語形態素解析のためのメイントークナイザーを提供します。
//! Viterbiアルゴリズムを使用して、入力文を最小コストの形態素列に分割します。
//!
//! # 主要な構造体
//!
//! - [`Tokenizer`]: 形態素解析を実行するメイントークナイザー構造体
//! - [`Worker`]: トークナイザーのワーカー。実際の解析処理を行う
//!
//! # 例
//!
//! ```no_run
//! use readmaker_morph::{Dictionary, LoadMode, Tokenizer};
//!
//! let dict = Dictionary::from_path("dictionaries/ipadic.dic", LoadMode::Validate)?;
//! let tokenizer = Tokenizer::new(dict);
//! let mut worker = tokenizer.new_worker();
//!
//! worker.reset_sentence("自然言語処理");
//! worker.tokenize()?;
//!
//! for token in worker.token_iter() {
//!     println!("{}", token.surface());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub(crate) mod lattice;
pub mod worker;

use std::sync::Arc;

use crate::common::SPACE_CATEGORY;
use crate::dictionary::connector::ConnectorCost;
use crate::dictionary::{Dictionary, DictionaryInner};
use crate::errors::{MorphError, Result};
use crate::sentence::Sentence;
use crate::token::TokenBuf;
use crate::tokenizer::lattice::Lattice;
use crate::tokenizer::worker::Worker;

/// 形態素解析を行うトークナイザー。
///
/// 辞書への`Arc`を保持するだけなので、クローンは安価です。
/// 複数の[`Worker`]を生成して、スレッドごとに並列に解析できます。
///
/// # 例
///
/// ```no_run
/// use readmaker_morph::{Dictionary, LoadMode, Tokenizer};
///
/// let dict = Dictionary::from_path("dictionaries/ipadic.dic", LoadMode::Validate)?;
/// let tokenizer = Tokenizer::new(dict);
/// let tokens = tokenizer.analyze("形態素解析")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct Tokenizer {
    dict: Arc<Dictionary>,
    // For the MeCab compatibility
    space_cateset: Option<u32>,
    max_grouping_len: Option<usize>,
}

impl Tokenizer {
    /// 新しいトークナイザーを作成します。
    ///
    /// 辞書はトークナイザーに所有権が移動します。複数のトークナイザー間で辞書を共有する
    /// 必要がある場合は、[`Tokenizer::from_shared_dictionary`]を使用してください。
    pub fn new(dict: Dictionary) -> Self {
        Self::from_shared_dictionary(Arc::new(dict))
    }

    /// `DictionaryInner`から新しいトークナイザーを作成します。
    pub fn from_inner(dict: DictionaryInner) -> Self {
        Self::new(Dictionary::from_inner(dict))
    }

    /// 共有された辞書から新しいトークナイザーを作成します。
    ///
    /// # 例
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use readmaker_morph::{Dictionary, LoadMode, Tokenizer};
    ///
    /// let dict = Arc::new(Dictionary::from_path("dictionaries/ipadic.dic", LoadMode::Validate)?);
    /// let tokenizer1 = Tokenizer::from_shared_dictionary(dict.clone());
    /// let tokenizer2 = Tokenizer::from_shared_dictionary(dict);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_shared_dictionary(dict: Arc<Dictionary>) -> Self {
        Self {
            dict,
            space_cateset: None,
            max_grouping_len: None,
        }
    }

    /// トークンからスペースを無視するかどうかを設定します。
    ///
    /// 有効にすると、単語間の`SPACE`カテゴリの文字はどのトークンにも含まれません。
    ///
    /// # エラー
    ///
    /// 入力辞書に`SPACE`カテゴリが定義されていない場合、[`MorphError`]が返されます。
    pub fn ignore_space(mut self, yes: bool) -> Result<Self> {
        if yes {
            let cate_id = self
                .dict
                .inner()
                .char_prop()
                .cate_id(SPACE_CATEGORY)
                .ok_or_else(|| {
                    MorphError::invalid_argument(
                        "dict",
                        "SPACE is not defined in the input dictionary (i.e., char.def).",
                    )
                })?;
            self.space_cateset = Some(1 << cate_id);
        } else {
            self.space_cateset = None;
        }
        Ok(self)
    }

    /// 未知語の最大グルーピング長を指定します。
    ///
    /// `0`を指定すると無制限になります（デフォルト）。
    /// MeCabと同じ結果を得たい場合は`24`を指定してください。
    pub const fn max_grouping_len(mut self, max_grouping_len: usize) -> Self {
        if max_grouping_len != 0 {
            self.max_grouping_len = Some(max_grouping_len);
        } else {
            self.max_grouping_len = None;
        }
        self
    }

    /// 辞書への参照を取得します。
    #[inline(always)]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// 新しいワーカーを作成します。
    ///
    /// 各ワーカーは独立したラティスを保持するため、スレッドごとに1つ作成してください。
    pub fn new_worker(&self) -> Worker {
        Worker::new(self.clone())
    }

    /// テキストを解析し、トークン列を返します。
    ///
    /// 空文字列に対しては空のベクトルを返します。呼び出しごとにワーカーを作成するので、
    /// 大量の文を処理する場合は[`Worker`]を再利用してください。
    ///
    /// # エラー
    ///
    /// 入力が長すぎる場合は[`MorphError::InvalidInput`]、
    /// 辞書に欠陥がある場合は[`MorphError::LatticeBroken`]を返します。
    pub fn analyze(&self, text: &str) -> Result<Vec<TokenBuf>> {
        let mut worker = self.new_worker();
        worker.reset_sentence(text);
        worker.tokenize()?;
        Ok(worker.token_bufs())
    }

    /// バイト列を解析します。
    ///
    /// # エラー
    ///
    /// 入力がUTF-8として不正な場合は[`MorphError::InvalidInput`]を返します。
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<Vec<TokenBuf>> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            MorphError::InvalidInput(format!("input is not valid UTF-8: {e}"))
        })?;
        self.analyze(text)
    }

    /// テキストを解析し、表層形の列を返します。
    pub fn analyze_surfaces(&self, text: &str) -> Result<Vec<String>> {
        let mut worker = self.new_worker();
        worker.reset_sentence(text);
        worker.tokenize()?;
        Ok(worker
            .token_iter()
            .map(|t| t.surface().to_string())
            .collect())
    }

    /// ラティス構造を構築します。
    pub(crate) fn build_lattice(&self, sent: &Sentence, lattice: &mut Lattice) -> Result<()> {
        let dict = self.dict.inner();
        self.build_lattice_inner(sent, lattice, dict, dict.connector())
    }

    fn build_lattice_inner<C>(
        &self,
        sent: &Sentence,
        lattice: &mut Lattice,
        dict: &DictionaryInner,
        connector: &C,
    ) -> Result<()>
    where
        C: ConnectorCost,
    {
        lattice.reset(sent.len_char());

        // These variables indicate the starting character positions of words currently stored
        // in the lattice. If ignore_space() is unset, these always have the same values, and
        // start_node is practically non-functional. If ignore_space() is set, start_node and
        // start_word indicate the starting positions containing and ignoring a space character,
        // respectively. Suppose handle sentence "mens second" at position 4. start_node indicates
        // position 4, and start_word indicates position 5.
        let mut start_node = 0;
        let mut start_word = 0;

        while start_word < sent.len_char() {
            if !lattice.has_previous_node(start_node) {
                start_word += 1;
                start_node = start_word;
                continue;
            }

            if let Some(space_cateset) = self.space_cateset {
                let is_space = (sent.char_info(start_node).cate_idset() & space_cateset) != 0;
                if is_space {
                    start_word += sent.groupable(start_node);
                }
            }

            // Does the input end with spaces?
            if start_word == sent.len_char() {
                break;
            }

            let inserted =
                self.add_lattice_edges(sent, lattice, start_node, start_word, dict, connector);
            if inserted == 0 {
                log::debug!("no outgoing node at position {start_word}: {lattice:?}");
                return Err(MorphError::LatticeBroken {
                    position: start_word,
                });
            }

            start_word += 1;
            start_node = start_word;
        }

        lattice.insert_eos(start_node, connector)
    }

    /// 辞書語と未知語をラティスに追加し、挿入したノード数を返します。
    ///
    /// # 引数
    ///
    /// * `start_node` - ノードの開始位置（スペースを含む）
    /// * `start_word` - 単語の開始位置（スペースを除く）
    fn add_lattice_edges<C>(
        &self,
        sent: &Sentence,
        lattice: &mut Lattice,
        start_node: usize,
        start_word: usize,
        dict: &DictionaryInner,
        connector: &C,
    ) -> usize
    where
        C: ConnectorCost,
    {
        let mut has_matched = false;
        let mut inserted = 0;
        let suffix = &sent.chars()[start_word..];

        for m in dict.lexicon().common_prefix_iterator(suffix) {
            debug_assert!(start_word + m.end_char <= sent.len_char());
            if lattice.insert_node(
                start_node,
                start_word,
                start_word + m.end_char,
                m.word_idx,
                m.word_param,
                connector,
            ) {
                inserted += 1;
            }
            has_matched = true;
        }

        dict.unk_handler().gen_unk_words(
            sent,
            start_word,
            has_matched,
            self.max_grouping_len,
            |w| {
                if lattice.insert_node(
                    start_node,
                    w.start_char(),
                    w.end_char(),
                    w.word_idx(),
                    w.word_param(),
                    connector,
                ) {
                    inserted += 1;
                }
            },
        );

        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dictionary::SystemDictionaryBuilder;

    const LEXICON_CSV: &str = "自然,0,0,1,sizen
言語,0,0,4,gengo
処理,0,0,3,shori
自然言語,0,0,6,sizengengo
言語処理,0,0,5,gengoshori";

    #[track_caller]
    fn build_test_dictionary(
        lexicon_csv: &str,
        matrix_def: &str,
        char_def: &str,
        unk_def: &str,
    ) -> Dictionary {
        let dict_inner = SystemDictionaryBuilder::from_readers(
            lexicon_csv.as_bytes(),
            matrix_def.as_bytes(),
            char_def.as_bytes(),
            unk_def.as_bytes(),
        )
        .unwrap();

        Dictionary::from_inner(dict_inner)
    }

    #[test]
    fn test_tokenize_1() {
        let dict = build_test_dictionary(
            LEXICON_CSV,
            "1 1\n0 0 0",
            "DEFAULT 0 1 0",
            "DEFAULT,0,0,100,*",
        );

        let tokenizer = Tokenizer::new(dict);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("自然言語処理");
        worker.tokenize().unwrap();
        assert_eq!(worker.num_tokens(), 2);

        {
            let t = worker.token(0);
            assert_eq!(t.surface(), "自然");
            assert_eq!(t.range_char(), 0..2);
            assert_eq!(t.range_byte(), 0..6);
            assert_eq!(t.feature(), "sizen");
            assert_eq!(t.total_cost(), 1);
        }
        {
            let t = worker.token(1);
            assert_eq!(t.surface(), "言語処理");
            assert_eq!(t.range_char(), 2..6);
            assert_eq!(t.range_byte(), 6..18);
            assert_eq!(t.feature(), "gengoshori");
            assert_eq!(t.total_cost(), 6);
        }
    }

    #[test]
    fn test_tokenize_2() {
        let dict = build_test_dictionary(
            LEXICON_CSV,
            "1 1\n0 0 0",
            "DEFAULT 0 1 0",
            "DEFAULT,0,0,100,*",
        );

        let tokenizer = Tokenizer::new(dict);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("自然日本語処理");
        worker.tokenize().unwrap();
        assert_eq!(worker.num_tokens(), 2);

        {
            let t = worker.token(0);
            assert_eq!(t.surface(), "自然");
            assert_eq!(t.range_char(), 0..2);
            assert_eq!(t.range_byte(), 0..6);
            assert_eq!(t.feature(), "sizen");
            assert_eq!(t.total_cost(), 1);
        }
        {
            let t = worker.token(1);
            assert_eq!(t.surface(), "日本語処理");
            assert_eq!(t.range_char(), 2..7);
            assert_eq!(t.range_byte(), 6..21);
            assert_eq!(t.feature(), "*");
            assert_eq!(t.lex_type(), crate::dictionary::LexType::Unknown);
            assert_eq!(t.total_cost(), 101);
        }
    }

    #[test]
    fn test_tokenize_3() {
        let dict = build_test_dictionary(
            LEXICON_CSV,
            "1 1\n0 0 0",
            "DEFAULT 0 0 3",
            "DEFAULT,0,0,100,*",
        );

        let tokenizer = Tokenizer::new(dict);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("不自然言語処理");
        worker.tokenize().unwrap();
        assert_eq!(worker.num_tokens(), 2);

        {
            let t = worker.token(0);
            assert_eq!(t.surface(), "不自然");
            assert_eq!(t.range_char(), 0..3);
            assert_eq!(t.range_byte(), 0..9);
            assert_eq!(t.feature(), "*");
            assert_eq!(t.total_cost(), 100);
        }
        {
            let t = worker.token(1);
            assert_eq!(t.surface(), "言語処理");
            assert_eq!(t.range_char(), 3..7);
            assert_eq!(t.range_byte(), 9..21);
            assert_eq!(t.feature(), "gengoshori");
            assert_eq!(t.total_cost(), 105);
        }
    }

    #[test]
    fn test_tokenize_empty() {
        let dict = build_test_dictionary(
            LEXICON_CSV,
            "1 1\n0 0 0",
            "DEFAULT 0 0 3",
            "DEFAULT,0,0,100,*",
        );

        let tokenizer = Tokenizer::new(dict);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("");
        worker.tokenize().unwrap();
        assert_eq!(worker.num_tokens(), 0);
        assert!(tokenizer.analyze("").unwrap().is_empty());
    }

    #[test]
    fn test_ignore_space() {
        let dict = build_test_dictionary(
            LEXICON_CSV,
            "1 1\n0 0 0",
            "DEFAULT 0 1 0\nSPACE 0 1 0\n0x0020 SPACE",
            "DEFAULT,0,0,100,*",
        );

        let tokenizer = Tokenizer::new(dict).ignore_space(true).unwrap();
        let surfaces = tokenizer.analyze_surfaces("自然  言語処理 ").unwrap();
        assert_eq!(surfaces, vec!["自然", "言語処理"]);

        let tokens = tokenizer.analyze("自然  言語処理 ").unwrap();
        assert_eq!(tokens[1].range_byte(), 8..20);
    }

    #[test]
    fn test_ignore_space_undefined() {
        let dict = build_test_dictionary(
            LEXICON_CSV,
            "1 1\n0 0 0",
            "DEFAULT 0 1 0",
            "DEFAULT,0,0,100,*",
        );
        assert!(Tokenizer::new(dict).ignore_space(true).is_err());
    }

    #[test]
    fn test_max_grouping_len() {
        let dict = build_test_dictionary(
            LEXICON_CSV,
            "1 1\n0 0 0",
            "DEFAULT 0 1 0",
            "DEFAULT,0,0,100,*",
        );

        // The 3-char run at 0 is too long to group; the 2-char run at 1 is not.
        let tokenizer = Tokenizer::new(dict).max_grouping_len(2);
        let surfaces = tokenizer.analyze_surfaces("日本語").unwrap();
        assert_eq!(surfaces, vec!["日", "本語"]);
    }

    #[test]
    fn test_analyze_bytes_invalid_utf8() {
        let dict = build_test_dictionary(
            LEXICON_CSV,
            "1 1\n0 0 0",
            "DEFAULT 0 1 0",
            "DEFAULT,0,0,100,*",
        );
        let tokenizer = Tokenizer::new(dict);
        assert!(matches!(
            tokenizer.analyze_bytes(&[0xE8, 0x87]),
            Err(MorphError::InvalidInput(_))
        ));
        assert_eq!(
            tokenizer.analyze_bytes("言語".as_bytes()).unwrap()[0].surface,
            "言語"
        );
    }
}
