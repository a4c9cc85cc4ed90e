//! フルビルドモジュール
//!
//! ソースの正規化とバイナリ辞書の構築を一括で実行します。
//! 正規化済みのソースも出力ディレクトリに残ります。

use std::path::PathBuf;

use clap::Parser;

use crate::build::{self, BuildError, BuildSource};
use crate::normalize::{self, NormalizeError};

/// フルビルドコマンドの引数
#[derive(Parser, Debug)]
#[clap(
    name = "full-build",
    about = "Normalizes a legacy-encoded IPADIC source and builds the dictionary in one step"
)]
pub struct Args {
    /// Directory containing *.csv, char.def, unk.def, and matrix.def.
    #[clap(short = 's', long, value_name = "SOURCE_DIR")]
    pub source_dir: PathBuf,

    /// Directory to which all artifacts will be output.
    #[clap(short = 'o', long, value_name = "OUTPUT_DIR")]
    pub out_dir: PathBuf,

    /// Encoding of the source files.
    #[clap(short = 'e', long, default_value = "EUC-JP")]
    pub encoding: String,

    /// File name of the dictionary in the output directory.
    #[clap(long, default_value = "ipadic.dic")]
    pub sysdic_name: String,

    /// Compresses the dictionary with zstd. `.zst` is appended to the file name.
    #[clap(long)]
    pub zstd: bool,
}

/// フルビルド処理中に発生する可能性のあるエラー
#[derive(Debug, thiserror::Error)]
pub enum FullBuildError {
    /// 正規化中のエラー
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    /// 辞書ビルド中のエラー
    #[error(transparent)]
    Build(#[from] BuildError),
    /// 入出力エラー
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// フルビルドコマンドを実行する
///
/// 1. ソースを`out_dir/source`に正規化
/// 2. 正規化済みソースからバイナリ辞書を構築
pub fn run(args: Args) -> Result<(), FullBuildError> {
    std::fs::create_dir_all(&args.out_dir)?;
    let normalized_dir = args.out_dir.join("source");

    println!("[1/2] Normalizing source files...");
    let report = normalize::normalize_sources(&args.source_dir, &normalized_dir, &args.encoding)?;

    println!("[2/2] Building binary dictionary...");
    let dict = build::build_dictionary(&BuildSource::FromDir(normalized_dir))?;

    let mut sysdic_path = args.out_dir.join(&args.sysdic_name);
    if args.zstd {
        sysdic_path.as_mut_os_string().push(".zst");
    }
    build::write_dictionary(&dict, &sysdic_path, args.zstd)?;

    println!(
        "Successfully built {} ({} rows, {} skipped)",
        sysdic_path.display(),
        report.total_rows,
        report.num_skipped()
    );
    Ok(())
}
