//! ReadMaker辞書コンパイラのメインエントリーポイント
//!
//! レガシーエンコーディングで書かれたIPADIC形式のソースを正規化し、
//! トークナイザーが読み込むバイナリ辞書を構築するCLIツールです。

mod build;
mod full_build;
mod normalize;

use clap::Parser;
use thiserror::Error;

use crate::{build::BuildError, full_build::FullBuildError, normalize::NormalizeError};

/// コマンドライン引数の構造体
#[derive(Parser, Debug)]
#[clap(name = "compile", version)]
struct Cli {
    /// 実行するサブコマンド
    #[clap(subcommand)]
    command: Command,
}

/// 利用可能なサブコマンド
///
/// 各サブコマンドは辞書構築プロセスの異なる段階に対応します。
#[derive(Parser, Debug)]
enum Command {
    /// ソースディレクトリを正規化し、UTF-8のソースファイルを出力します
    ///
    /// `*.csv`は1つの`lex.csv`にまとめられます。
    Normalize(normalize::Args),

    /// 正規化済みのソースファイルからバイナリ辞書を構築します
    Build(build::Args),

    /// 正規化とビルドを一度に実行します
    FullBuild(full_build::Args),
}

/// コンパイラの実行中に発生する可能性のあるエラー
#[derive(Debug, Error)]
pub enum CompileError {
    /// 正規化中のエラー
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    /// 辞書ビルド中のエラー
    #[error(transparent)]
    Build(#[from] BuildError),
    /// フルビルド実行中のエラー
    #[error(transparent)]
    FullBuild(#[from] FullBuildError),
}

fn main() -> Result<(), CompileError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Normalize(args) => Ok(normalize::run(args)?),
        Command::Build(args) => Ok(build::run(args)?),
        Command::FullBuild(args) => Ok(full_build::run(args)?),
    }
}
