//! ソースの正規化モジュール
//!
//! レガシーエンコーディングのIPADIC形式ソースをUTF-8に変換し、
//! 語彙ファイルを1つの`lex.csv`にまとめます。

use std::path::{Path, PathBuf};

use clap::Parser;
use readmaker_morph::dictionary::source::{NormalizeReport, SourceNormalizer};
use readmaker_morph::errors::MorphError;

/// 正規化コマンドの引数
#[derive(Parser, Debug)]
#[clap(
    name = "normalize",
    about = "Converts a legacy-encoded IPADIC source directory into UTF-8 sources."
)]
pub struct Args {
    /// Directory containing *.csv, char.def, unk.def, and matrix.def.
    #[clap(short = 's', long, value_name = "SOURCE_DIR")]
    pub source_dir: PathBuf,

    /// Directory to which the normalized sources are output.
    /// If it is the source directory, outputs are suffixed with _utf8 (e.g., lex_utf8.csv).
    #[clap(short = 'o', long, value_name = "OUTPUT_DIR")]
    pub out_dir: PathBuf,

    /// Encoding of the source files (a WHATWG label such as EUC-JP or Shift_JIS).
    #[clap(short = 'e', long, default_value = "EUC-JP")]
    pub encoding: String,
}

/// 正規化処理中に発生する可能性のあるエラー
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// ソースの読み込みまたは変換のエラー
    #[error("Normalization failed: {0}")]
    Morph(#[from] MorphError),
}

/// 正規化コマンドを実行する
pub fn run(args: Args) -> Result<(), NormalizeError> {
    let report = normalize_sources(&args.source_dir, &args.out_dir, &args.encoding)?;
    println!(
        "Successfully normalized {} rows into {}",
        report.total_rows,
        args.out_dir.display()
    );
    Ok(())
}

/// ソースディレクトリを正規化し、レポートの要約を出力する
///
/// CLIに依存しないコアの正規化ロジックです。`full-build`からも使われます。
pub fn normalize_sources(
    source_dir: &Path,
    out_dir: &Path,
    encoding: &str,
) -> Result<NormalizeReport, NormalizeError> {
    let normalizer = SourceNormalizer::new(encoding)?;
    println!(
        "Normalizing {} ({})...",
        source_dir.display(),
        normalizer.encoding_name()
    );
    let report = normalizer.normalize_dir(source_dir, out_dir)?;

    for file in &report.files {
        println!("  {}: {} rows, {} skipped", file.file, file.rows, file.skipped);
    }
    if report.num_skipped() != 0 {
        log::warn!(
            "{} malformed rows were skipped; the first is {}:{} ({})",
            report.num_skipped(),
            report.skipped[0].file,
            report.skipped[0].line,
            report.skipped[0].reason,
        );
    }
    Ok(report)
}
