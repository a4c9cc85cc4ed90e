//! ホストアプリケーション向けのブリッジ
//!
//! 辞書が利用可能であればViterbiトークナイザーで、そうでなければ
//! [`FallbackTokenizer`]で解析します。どちらの経路を使ったかは
//! [`AnalysisMode`]として返されるので、縮退動作を呼び出し元で検知できます。
//!
//! ブリッジの関数はパニックを外に伝播させません。トークナイザー内部の
//! パニックやエラーは記録された上でフォールバック経路に切り替わります。
//!
//! ```no_run
//! use readmaker_morph::bridge::{Bridge, BridgeConfig};
//!
//! let bridge = Bridge::new(BridgeConfig::from_env());
//! let analysis = bridge.analyze_text("吾輩は猫である。");
//! if !analysis.is_native() {
//!     eprintln!("degraded: {:?}", analysis.mode);
//! }
//! println!("{}", bridge.analyze_json("吾輩は猫である。"));
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::dictionary::shared::{self, SharedDictionary};
use crate::dictionary::{Dictionary, LoadMode};
use crate::errors::Result;
use crate::fallback::FallbackTokenizer;
use crate::token::TokenBuf;
use crate::tokenizer::Tokenizer;

/// 辞書パスを上書きする環境変数
pub const DIC_PATH_ENV: &str = "READMAKER_DIC_PATH";

/// 既定の辞書パス
pub const DEFAULT_DIC_PATH: &str = "dictionaries/ipadic.dic";

/// 辞書の読み込みに失敗してから、解析時に再試行するまでの既定の間隔
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// ブリッジの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// 辞書アーティファクトのパス
    pub dict_path: PathBuf,
    /// 辞書の読み込みモード
    pub load_mode: LoadMode,
    /// 未知語の最大グルーピング長（0は無制限）
    pub max_grouping_len: usize,
    /// 単語間の空白をトークンから除外するか
    pub ignore_space: bool,
    /// 読み込みに失敗した後、解析時の再読み込みを控える時間
    pub retry_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            dict_path: PathBuf::from(DEFAULT_DIC_PATH),
            load_mode: LoadMode::default(),
            max_grouping_len: 0,
            ignore_space: false,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl BridgeConfig {
    /// 既定値に`READMAKER_DIC_PATH`を反映した設定を作成します。
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(DIC_PATH_ENV).filter(|p| !p.is_empty()) {
            config.dict_path = PathBuf::from(path);
        }
        config
    }

    /// 辞書パスを指定します。
    pub fn with_dict_path<P>(mut self, path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.dict_path = path.into();
        self
    }

    fn build_tokenizer(&self, dict: Arc<Dictionary>) -> Tokenizer {
        let tokenizer =
            Tokenizer::from_shared_dictionary(dict).max_grouping_len(self.max_grouping_len);
        if !self.ignore_space {
            return tokenizer;
        }
        match tokenizer.clone().ignore_space(true) {
            Ok(tokenizer) => tokenizer,
            Err(e) => {
                log::warn!("ignore_space is not applied: {e}");
                tokenizer
            }
        }
    }
}

/// 解析に使われた経路
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AnalysisMode {
    /// 辞書を使ったViterbi解析
    Native,
    /// 正規表現による簡易分割
    Fallback {
        /// フォールバックした理由
        reason: String,
    },
}

/// 解析結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub words: Vec<String>,
    pub mode: AnalysisMode,
}

impl Analysis {
    #[inline(always)]
    pub fn is_native(&self) -> bool {
        self.mode == AnalysisMode::Native
    }

    fn fallback<S>(input: &str, reason: S) -> Self
    where
        S: Into<String>,
    {
        let reason = reason.into();
        log::warn!("falling back to the regex splitter: {reason}");
        Self {
            words: FallbackTokenizer::new().split(input),
            mode: AnalysisMode::Fallback { reason },
        }
    }
}

/// 呼び出しごとに選択される解析器
#[derive(Clone)]
pub enum Analyzer {
    Native(Tokenizer),
    Fallback(FallbackTokenizer),
}

impl Analyzer {
    /// 辞書が利用可能ならネイティブ解析器、そうでなければフォールバックを選択します。
    pub fn select(dict: Option<Arc<Dictionary>>) -> Self {
        match dict {
            Some(dict) => Self::Native(Tokenizer::from_shared_dictionary(dict)),
            None => Self::Fallback(FallbackTokenizer::new()),
        }
    }

    /// テキストを解析します。
    ///
    /// ネイティブ解析がエラーまたはパニックで失敗した場合は、
    /// フォールバック結果を返します。
    pub fn analyze(&self, input: &str) -> Analysis {
        match self {
            Self::Native(tokenizer) => {
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| tokenizer.analyze_surfaces(input)));
                match result {
                    Ok(Ok(words)) => Analysis {
                        words,
                        mode: AnalysisMode::Native,
                    },
                    Ok(Err(e)) => {
                        log::warn!("native analysis failed: {e}");
                        Analysis::fallback(input, e.to_string())
                    }
                    Err(payload) => {
                        let msg = panic_message(payload.as_ref());
                        log::error!("native analysis panicked: {msg}");
                        Analysis::fallback(input, format!("panic: {msg}"))
                    }
                }
            }
            Self::Fallback(_) => Analysis::fallback(input, "dictionary is not loaded"),
        }
    }
}

enum Handle {
    Global,
    Local(SharedDictionary),
}

impl Handle {
    #[inline(always)]
    fn shared(&self) -> &SharedDictionary {
        match self {
            Self::Global => shared::global(),
            Self::Local(shared) => shared,
        }
    }
}

/// ブリッジの状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeStatus {
    /// 辞書が読み込み済みか
    pub ready: bool,
    pub dict_path: PathBuf,
    /// 読み込み済みの辞書の語彙エントリ数
    pub num_entries: Option<usize>,
    pub version: &'static str,
}

/// 設定と辞書ハンドルをまとめたブリッジ
///
/// [`Bridge::new`]はプロセス全体で共有される辞書ハンドルを使います。
/// 辞書の読み込みは最初に必要になった時点で一度だけ行われます。
pub struct Bridge {
    config: BridgeConfig,
    handle: Handle,
}

impl Bridge {
    /// プロセス全体の辞書ハンドルを使うブリッジを作成します。
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            handle: Handle::Global,
        }
    }

    /// 環境変数から設定を読み込んでブリッジを作成します。
    pub fn from_env() -> Self {
        Self::new(BridgeConfig::from_env())
    }

    /// このブリッジ専用の辞書ハンドルを持つブリッジを作成します。
    pub fn with_local_handle(config: BridgeConfig) -> Self {
        Self {
            config,
            handle: Handle::Local(SharedDictionary::new()),
        }
    }

    /// 構築済みの辞書を使うブリッジを作成します。
    pub fn with_dictionary(config: BridgeConfig, dict: Dictionary) -> Self {
        let shared = SharedDictionary::new();
        shared.install(dict);
        Self {
            config,
            handle: Handle::Local(shared),
        }
    }

    #[inline(always)]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// 辞書を読み込みます。すでに読み込まれていればそれを返します。
    ///
    /// 直前の読み込みが失敗していても、すぐに再試行します。
    ///
    /// # エラー
    ///
    /// 読み込みに失敗した場合は[`Dictionary::from_path`]のエラーを返します。
    pub fn initialize(&self) -> Result<Arc<Dictionary>> {
        self.handle
            .shared()
            .get_or_init(&self.config.dict_path, self.config.load_mode)
    }

    /// 解析のために辞書を用意します。
    ///
    /// 直前の失敗から`retry_interval`が経過するまでは読み込みを行いません。
    /// 読み込み中のパニックはここで止め、理由を文字列で返します。
    fn load_for_analysis(&self) -> std::result::Result<Arc<Dictionary>, String> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.handle.shared().get_or_init_throttled(
                &self.config.dict_path,
                self.config.load_mode,
                self.config.retry_interval,
            )
        }));
        match result {
            Ok(Ok(dict)) => Ok(dict),
            Ok(Err(e)) => Err(format!("dictionary unavailable: {e}")),
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log::error!("dictionary loading panicked: {msg}");
                Err(format!("panic while loading the dictionary: {msg}"))
            }
        }
    }

    /// 現在の状態で使う解析器を選択します。
    ///
    /// 辞書がまだ読み込まれていなければ読み込みを試みます。
    pub fn analyzer(&self) -> Analyzer {
        match self.load_for_analysis() {
            Ok(dict) => Analyzer::Native(self.config.build_tokenizer(dict)),
            Err(reason) => {
                log::warn!("{:?}: {reason}", self.config.dict_path);
                Analyzer::Fallback(FallbackTokenizer::new())
            }
        }
    }

    /// テキストを解析し、使用した経路とともに返します。
    pub fn analyze_text(&self, input: &str) -> Analysis {
        match self.load_for_analysis() {
            Ok(dict) => Analyzer::Native(self.config.build_tokenizer(dict)).analyze(input),
            Err(reason) => Analysis::fallback(input, reason),
        }
    }

    /// テキストを解析し、単語列を返します。
    pub fn analyze_words(&self, input: &str) -> Vec<String> {
        self.analyze_text(input).words
    }

    /// 複数のテキストを解析します。
    ///
    /// 解析器の選択は最初に一度だけ行われます。
    pub fn analyze_batch(&self, inputs: &[&str]) -> Vec<Analysis> {
        let analyzer = self.analyzer();
        inputs.iter().map(|input| analyzer.analyze(input)).collect()
    }

    /// テキストを解析し、単語列をJSON配列として返します。
    pub fn analyze_json(&self, input: &str) -> String {
        words_to_json(&self.analyze_words(input))
    }

    /// 現在の状態を返します。辞書の読み込みは行いません。
    pub fn status(&self) -> BridgeStatus {
        let dict = self.handle.shared().get();
        BridgeStatus {
            ready: dict.is_some(),
            dict_path: self.config.dict_path.clone(),
            num_entries: dict.map(|d| d.num_entries()),
            version: crate::VERSION,
        }
    }
}

/// テキストを解析します。
///
/// `handle`が`None`の場合はフォールバック分割器を使います。
///
/// ```
/// use readmaker_morph::bridge::analyze_text;
///
/// let analysis = analyze_text("今日は良い天気です。", None);
/// assert!(!analysis.is_native());
/// assert!(!analysis.words.is_empty());
/// ```
pub fn analyze_text(input: &str, handle: Option<&Arc<Dictionary>>) -> Analysis {
    Analyzer::select(handle.cloned()).analyze(input)
}

/// 単語列をJSON配列に変換します。
pub fn words_to_json(words: &[String]) -> String {
    serde_json::to_string(words).unwrap_or_else(|_| "[]".to_string())
}

/// トークン列を詳細なJSON配列に変換します。
pub fn tokens_to_json(tokens: &[TokenBuf]) -> Result<String> {
    Ok(serde_json::to_string(tokens)?)
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
