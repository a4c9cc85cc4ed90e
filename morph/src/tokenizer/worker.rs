//! トークン化処理のためのルーチンを提供するモジュール。
//!
//! ワーカーは内部データ構造を保持し、再利用することで不要なメモリアロケーションを避けます。
use crate::common::MAX_INPUT_BYTES;
use crate::errors::{MorphError, Result};
use crate::sentence::Sentence;
use crate::token::{Token, TokenBuf, TokenIter};
use crate::tokenizer::Tokenizer;
use crate::tokenizer::lattice::{Lattice, Node};

/// トークン化処理のためのルーチンを提供する構造体。
///
/// トークン化に使用される内部データ構造を保持し、それらを再利用することで
/// 不要なメモリ再割り当てを回避します。
///
/// # 例
///
/// ```ignore
/// let mut worker = tokenizer.new_worker();
/// worker.reset_sentence("日本語の文章");
/// worker.tokenize()?;
/// for token in worker.token_iter() {
///     println!("{}", token.surface());
/// }
/// ```
pub struct Worker {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) sent: Sentence,
    pub(crate) lattice: Lattice,
    // Stored from the end of the sentence.
    pub(crate) top_nodes: Vec<(usize, Node)>,
}

impl Worker {
    pub(crate) fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            sent: Sentence::new(),
            lattice: Lattice::default(),
            top_nodes: vec![],
        }
    }

    /// トークン化する入力文をリセットします。
    ///
    /// 新しい文を設定し、以前の結果をクリアします。
    pub fn reset_sentence<S>(&mut self, input: S)
    where
        S: AsRef<str>,
    {
        self.sent.clear();
        self.top_nodes.clear();
        let input = input.as_ref();
        if !input.is_empty() {
            self.sent.set_sentence(input);
            self.sent
                .compile(self.tokenizer.dictionary().inner().char_prop());
        }
    }

    /// 設定された入力文をトークン化します。
    ///
    /// 結果は[`token_iter()`](Self::token_iter)や[`token()`](Self::token)で参照できます。
    /// 空の文が設定されている場合は何も行いません。
    ///
    /// # エラー
    ///
    /// - 入力が[`MAX_INPUT_BYTES`]を超える場合は[`MorphError::InvalidInput`]
    /// - ラティスが文末まで接続できない場合は[`MorphError::LatticeBroken`]
    ///
    /// エラーの後もワーカーはそのまま再利用できます。
    pub fn tokenize(&mut self) -> Result<()> {
        self.top_nodes.clear();
        if self.sent.chars().is_empty() {
            return Ok(());
        }
        if self.sent.raw().len() > MAX_INPUT_BYTES {
            return Err(MorphError::InvalidInput(format!(
                "input is {} bytes, exceeding the limit of {MAX_INPUT_BYTES} bytes",
                self.sent.raw().len()
            )));
        }

        self.tokenizer.build_lattice(&self.sent, &mut self.lattice)?;
        self.lattice.append_top_nodes(&mut self.top_nodes);
        Ok(())
    }

    /// トークン化結果のトークン数を取得します。
    #[inline(always)]
    pub fn num_tokens(&self) -> usize {
        self.top_nodes.len()
    }

    /// `i`番目のトークンを取得します。
    ///
    /// # パニック
    ///
    /// `i`が[`num_tokens()`](Self::num_tokens)以上の場合、パニックします。
    #[inline(always)]
    pub fn token<'w>(&'w self, i: usize) -> Token<'w> {
        let index = self.num_tokens() - i - 1;
        Token::new(self, index)
    }

    /// トークン化結果のイテレータを作成します。
    #[inline(always)]
    pub fn token_iter<'w>(&'w self) -> TokenIter<'w> {
        TokenIter::new(self)
    }

    /// トークン化結果を所有型のトークン列として取得します。
    pub fn token_bufs(&self) -> Vec<TokenBuf> {
        self.token_iter().map(TokenBuf::from).collect()
    }
}
