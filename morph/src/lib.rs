//! # ReadMaker形態素解析エンジン
//!
//! 速読アプリReadMakerのための、ビタビアルゴリズムに基づく日本語形態素解析です。
//!
//! ## 概要
//!
//! - **辞書コンパイラ**: EUC-JPなどで書かれたIPADIC形式のソースをUTF-8に正規化し、
//!   rkyv形式のアーティファクトにまとめます（[`dictionary::source`]、[`SystemDictionaryBuilder`]）。
//! - **辞書ローダー**: アーティファクトをメモリマップして検証し、プロセス内で一度だけ
//!   読み込みます（[`Dictionary::from_path`]、[`dictionary::shared`]）。
//! - **トークナイザー**: ラティスを構築し、最小コストの形態素列を求めます（[`Tokenizer`]）。
//! - **ブリッジ**: 辞書が使えない場合は正規表現による分割に切り替え、
//!   C ABIから呼び出せる関数を提供します（[`bridge`]、[`ffi`]）。
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use readmaker_morph::{SystemDictionaryBuilder, Tokenizer};
//!
//! let lexicon_csv = "猫,1,1,100,名詞,一般,*,*,*,*,猫,ネコ,ネコ
//! で,2,2,100,助詞,格助詞,一般,*,*,*,で,デ,デ
//! ある,3,3,100,動詞,自立,*,*,五段・ラ行,基本形,ある,アル,アル
//! である,2,3,150,助動詞,*,*,*,特殊・ダ,連用形,だ,デアル,デアル";
//! let matrix_def = "4 4\n0 1 0\n0 2 0\n1 2 10\n1 3 10\n2 3 10\n3 0 0";
//! let char_def = "DEFAULT 0 1 0";
//! let unk_def = "DEFAULT,0,0,1000,名詞,一般,*,*,*,*,*";
//!
//! let dict = SystemDictionaryBuilder::from_readers(
//!     lexicon_csv.as_bytes(),
//!     matrix_def.as_bytes(),
//!     char_def.as_bytes(),
//!     unk_def.as_bytes(),
//! )?;
//!
//! let tokenizer = Tokenizer::from_inner(dict);
//! let mut worker = tokenizer.new_worker();
//!
//! worker.reset_sentence("猫である");
//! worker.tokenize()?;
//! assert_eq!(worker.num_tokens(), 2);
//!
//! let t0 = worker.token(0);
//! assert_eq!(t0.surface(), "猫");
//! assert_eq!(t0.range_char(), 0..1);
//! assert_eq!(t0.range_byte(), 0..3);
//! assert_eq!(t0.feature(), "名詞,一般,*,*,*,*,猫,ネコ,ネコ");
//!
//! let t1 = worker.token(1);
//! assert_eq!(t1.surface(), "である");
//! assert_eq!(t1.range_char(), 1..4);
//! assert_eq!(t1.range_byte(), 3..12);
//! assert_eq!(t1.total_cost(), 260);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// ホスト向けのブリッジ
pub mod bridge;

/// 共通の定数定義
pub mod common;

/// 辞書データ構造とビルダー
pub mod dictionary;

/// エラー型の定義
pub mod errors;

/// 辞書なしで動作する簡易分割器
pub mod fallback;

/// C ABI
pub mod ffi;

/// 文の内部表現
mod sentence;

/// トークン型の定義
pub mod token;

/// トークナイザーの実装
pub mod tokenizer;

/// 内部ユーティリティ関数
pub mod utils;


// Re-exports
pub use bridge::{Analysis, AnalysisMode, Analyzer, Bridge, BridgeConfig};
pub use dictionary::{Dictionary, LoadMode, SystemDictionaryBuilder};
pub use errors::{MorphError, Result};
pub use fallback::FallbackTokenizer;
pub use token::TokenBuf;
pub use tokenizer::Tokenizer;

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
