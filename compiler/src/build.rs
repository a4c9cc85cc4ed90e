//! システム辞書のビルドモジュール
//!
//! 正規化済みのソースファイル(lex.csv, matrix.def等)から
//! バイナリ形式のシステム辞書を構築します。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use readmaker_morph::dictionary::{DictionaryInner, SystemDictionaryBuilder};
use readmaker_morph::errors::MorphError;

/// Zstandard圧縮のレベル
const ZSTD_LEVEL: i32 = 19;

/// ビルドコマンドの引数
///
/// 入力は正規化済みのディレクトリか、個別のファイルで指定します。
#[derive(Parser, Debug)]
#[clap(name = "build", about = "A program to build the system dictionary.")]
pub struct Args {
    /// Directory containing normalized lex.csv, matrix.def, char.def, and unk.def.
    ///
    /// If this argument is not specified, all of `--lexicon-in`, `--matrix-in`,
    /// `--char-in`, and `--unk-in` must be specified.
    #[clap(short = 'd', long)]
    source_dir: Option<PathBuf>,

    /// System lexicon file (lex.csv).
    #[clap(short = 'l', long)]
    lexicon_in: Option<PathBuf>,

    /// Matrix definition file (matrix.def).
    #[clap(short = 'm', long)]
    matrix_in: Option<PathBuf>,

    /// Character definition file (char.def).
    #[clap(short = 'c', long)]
    char_in: Option<PathBuf>,

    /// Unknown word definition file (unk.def).
    #[clap(short = 'u', long)]
    unk_in: Option<PathBuf>,

    /// File to which the binary dictionary is output.
    #[clap(short = 'o', long)]
    sysdic_out: PathBuf,

    /// Compresses the output with zstd.
    #[clap(long)]
    zstd: bool,
}

/// ビルド処理中に発生する可能性のあるエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// 不正な引数の組み合わせ
    #[error(
        "Invalid argument combination: Either --source-dir or all of \
        --{{lexicon,matrix,char,unk}}-in must be specified."
    )]
    InvalidSourceArguments,

    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 辞書構築エラー
    #[error("Dictionary building failed: {0}")]
    Morph(#[from] MorphError),
}

/// 辞書ビルドのソースファイル情報
pub enum BuildSource {
    /// 正規化済みディレクトリから構築
    FromDir(PathBuf),
    /// 個別のファイルから構築
    FromFiles {
        /// 語彙ファイル(lex.csv)のパス
        lexicon: PathBuf,
        /// 連接コスト定義ファイル(matrix.def)のパス
        matrix: PathBuf,
        /// 文字定義ファイル(char.def)のパス
        char_def: PathBuf,
        /// 未知語定義ファイル(unk.def)のパス
        unk_def: PathBuf,
    },
}

fn get_source_from_args(args: &Args) -> Result<BuildSource, BuildError> {
    if let Some(dir) = &args.source_dir {
        return Ok(BuildSource::FromDir(dir.clone()));
    }
    match (&args.lexicon_in, &args.matrix_in, &args.char_in, &args.unk_in) {
        (Some(lexicon), Some(matrix), Some(char_def), Some(unk_def)) => {
            Ok(BuildSource::FromFiles {
                lexicon: lexicon.clone(),
                matrix: matrix.clone(),
                char_def: char_def.clone(),
                unk_def: unk_def.clone(),
            })
        }
        _ => Err(BuildError::InvalidSourceArguments),
    }
}

/// ビルドコマンドを実行する
///
/// 指定されたソースファイルから辞書を構築し、バイナリ形式で出力します。
pub fn run(args: Args) -> Result<(), BuildError> {
    let source = get_source_from_args(&args)?;

    println!("Compiling the system dictionary...");
    let dict = build_dictionary(&source)?;

    println!("Writing the system dictionary...");
    write_dictionary(&dict, &args.sysdic_out, args.zstd)?;

    println!(
        "Successfully built the dictionary to {}",
        args.sysdic_out.display()
    );
    Ok(())
}

/// 指定されたソースファイルから辞書を構築する
///
/// CLIに依存しないコアのビルドロジックです。
pub fn build_dictionary(source: &BuildSource) -> Result<DictionaryInner, BuildError> {
    let dict = match source {
        BuildSource::FromDir(dir) => SystemDictionaryBuilder::from_dir(dir)?,
        BuildSource::FromFiles {
            lexicon,
            matrix,
            char_def,
            unk_def,
        } => SystemDictionaryBuilder::from_readers(
            File::open(lexicon)?,
            File::open(matrix)?,
            File::open(char_def)?,
            File::open(unk_def)?,
        )?,
    };
    Ok(dict)
}

/// 辞書をファイルに書き出す
///
/// `zstd`が真の場合はレベル19で圧縮します。
pub fn write_dictionary(
    dict: &DictionaryInner,
    path: &Path,
    zstd: bool,
) -> Result<(), BuildError> {
    let file = File::create(path)?;
    if zstd {
        let mut encoder = zstd::Encoder::new(file, ZSTD_LEVEL)?;
        dict.write(&mut encoder)?;
        encoder.finish()?;
    } else {
        let mut wtr = BufWriter::new(file);
        dict.write(&mut wtr)?;
        wtr.flush()?;
    }
    Ok(())
}
