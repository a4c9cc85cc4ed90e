//! エラー型の定義
//!
//! このモジュールは、形態素解析エンジンで使用されるすべてのエラー型を定義します。
//! 辞書コンパイラ、辞書ローダー、トークナイザーの各段階で発生するエラーを
//! 単一の列挙型[`MorphError`]にまとめています。

use std::error::Error;
use std::fmt::{self, Debug};
use std::path::PathBuf;

/// このクレート専用のResult型
///
/// エラー型としてデフォルトで[`MorphError`]を使用します。
pub type Result<T, E = MorphError> = std::result::Result<T, E>;

/// 形態素解析エンジンのエラー型
///
/// このライブラリで発生する可能性のあるすべてのエラーを表現します。
/// 各バリアントは特定のエラー条件に対応しています。
#[derive(Debug, thiserror::Error)]
pub enum MorphError {
    /// 無効な引数エラー
    ///
    /// [`InvalidArgumentError`]のエラーバリアント。
    #[error(transparent)]
    InvalidArgument(InvalidArgumentError),

    /// 無効なフォーマットエラー
    ///
    /// [`InvalidFormatError`]のエラーバリアント。
    #[error(transparent)]
    InvalidFormat(InvalidFormatError),

    /// 無効な状態エラー
    ///
    /// [`InvalidStateError`]のエラーバリアント。
    #[error(transparent)]
    InvalidState(InvalidStateError),

    /// ソースファイルが指定されたエンコーディングで復号できない
    ///
    /// 辞書コンパイラの正規化段階で発生します。コンパイルは中断されます。
    #[error("{path:?} contains byte sequences that are invalid in {encoding}")]
    InvalidEncoding {
        /// 復号に失敗したファイル
        path: PathBuf,
        /// 使用したエンコーディング名
        encoding: &'static str,
    },

    /// 辞書ソースディレクトリに必要なファイルが存在しない
    #[error("required source file is missing: {0:?}")]
    MissingFile(PathBuf),

    /// 辞書アーティファクトが存在しない
    #[error("dictionary artifact not found: {0:?}")]
    NotFound(PathBuf),

    /// 辞書アーティファクトが破損している
    ///
    /// マジックバイトの不一致、rkyvの検証失敗、ヘッダと本体の不整合などで発生します。
    #[error("corrupt dictionary artifact: {0}")]
    CorruptArtifact(String),

    /// 入力テキストが受け付けられない
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// ラティスが終端まで接続できなかった
    ///
    /// 未知語処理が正しく構成されていれば発生しません。辞書の欠陥を示します。
    #[error("lattice is broken at character position {position}")]
    LatticeBroken {
        /// 接続が途切れた文字位置
        position: usize,
    },

    /// 整数変換エラー
    ///
    /// [`TryFromIntError`](std::num::TryFromIntError)のエラーバリアント。
    #[error(transparent)]
    TryFromInt(std::num::TryFromIntError),

    /// 整数パースエラー
    ///
    /// [`ParseIntError`](std::num::ParseIntError)のエラーバリアント。
    #[error(transparent)]
    ParseInt(std::num::ParseIntError),

    /// UTF-8エンコーディングエラー
    ///
    /// [`std::str::Utf8Error`]のエラーバリアント。
    #[error(transparent)]
    Utf8(std::str::Utf8Error),

    /// 標準I/Oエラー
    ///
    /// [`std::io::Error`]のエラーバリアント。
    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    /// rkyvシリアライゼーションエラー
    ///
    /// [`rkyv::rancor::Error`](rkyv::rancor::Error)のエラーバリアント。
    #[error(transparent)]
    Rkyv(#[from] rkyv::rancor::Error),

    /// 一時ファイルの永続化エラー
    ///
    /// [`tempfile::PersistError`](tempfile::PersistError)のエラーバリアント。
    #[error(transparent)]
    PathPersist(#[from] tempfile::PersistError),

    /// JSONシリアライゼーションエラー
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl MorphError {
    /// 無効な引数エラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - 引数の名前
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    /// 無効なフォーマットエラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - フォーマット名
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_format<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidFormat(InvalidFormatError {
            arg,
            msg: msg.into(),
        })
    }

    /// 無効な状態エラーを生成します
    ///
    /// # 引数
    ///
    /// * `msg` - エラーメッセージ
    /// * `cause` - エラーの原因
    pub(crate) fn invalid_state<S, M>(msg: S, cause: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Self::InvalidState(InvalidStateError {
            msg: msg.into(),
            cause: cause.into(),
        })
    }

    /// 破損アーティファクトエラーを生成します
    pub(crate) fn corrupt<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::CorruptArtifact(msg.into())
    }
}

/// 引数が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// 引数の名前
    pub(crate) arg: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// 入力フォーマットが無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidFormatError {
    /// フォーマットの名前
    pub(crate) arg: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for InvalidFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidFormatError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidFormatError {}

/// 状態が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidStateError {
    /// エラーメッセージ
    pub(crate) msg: String,

    /// エラーの根本原因
    pub(crate) cause: String,
}

impl fmt::Display for InvalidStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidStateError: {}: {}", self.msg, self.cause)
    }
}

impl Error for InvalidStateError {}

impl From<std::num::TryFromIntError> for MorphError {
    fn from(error: std::num::TryFromIntError) -> Self {
        Self::TryFromInt(error)
    }
}

impl From<std::num::ParseIntError> for MorphError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::ParseInt(error)
    }
}

impl From<std::str::Utf8Error> for MorphError {
    fn from(error: std::str::Utf8Error) -> Self {
        Self::Utf8(error)
    }
}
