//! 形態素解析を実行するユーティリティ
//!
//! このバイナリは、標準入力から読み込んだテキストを形態素解析し、
//! 指定された出力形式（mecab、wakati、detail、json）で結果を出力します。

use std::error::Error;
use std::io::{BufRead, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use readmaker_morph::bridge::BridgeConfig;
use readmaker_morph::{Dictionary, LoadMode, Tokenizer};

/// 出力モード
#[derive(Clone, Debug)]
enum OutputMode {
    Mecab,
    Wakati,
    Detail,
    Json,
}

impl FromStr for OutputMode {
    type Err = &'static str;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "mecab" => Ok(Self::Mecab),
            "wakati" => Ok(Self::Wakati),
            "detail" => Ok(Self::Detail),
            "json" => Ok(Self::Json),
            _ => Err("Could not parse a mode"),
        }
    }
}

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(name = "tokenize", about = "Predicts morphemes")]
struct Args {
    /// System dictionary. Defaults to $READMAKER_DIC_PATH or dictionaries/ipadic.dic.
    #[clap(short = 'i', long)]
    sysdic: Option<PathBuf>,

    /// Output mode. Choices are mecab, wakati, detail, and json.
    #[clap(short = 'O', long, default_value = "mecab")]
    output_mode: OutputMode,

    /// Ignores white spaces in input strings.
    #[clap(short = 'S', long)]
    ignore_space: bool,

    /// Maximum length of unknown words.
    #[clap(short = 'M', long)]
    max_grouping_len: Option<usize>,

    /// Skips byte validation when a proof of a previous validation exists.
    #[clap(long)]
    trust_cache: bool,
}

/// 辞書をロードし、標準入力から読み込んだテキストを形態素解析して、
/// 指定された形式で結果を標準出力に出力します。
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let sysdic = args
        .sysdic
        .unwrap_or_else(|| BridgeConfig::from_env().dict_path);
    let mode = if args.trust_cache {
        LoadMode::TrustCache
    } else {
        LoadMode::Validate
    };

    eprintln!("Loading the dictionary...");
    let dict = Dictionary::from_path(&sysdic, mode)?;
    log::info!("{} entries loaded from {}", dict.num_entries(), sysdic.display());

    let tokenizer = Tokenizer::new(dict)
        .ignore_space(args.ignore_space)?
        .max_grouping_len(args.max_grouping_len.unwrap_or(0));
    let mut worker = tokenizer.new_worker();

    eprintln!("Ready to tokenize");

    let is_tty = std::io::stdout().is_terminal();

    let out = std::io::stdout();
    let mut out = BufWriter::new(out.lock());
    let lines = std::io::stdin().lock().lines();
    for line in lines {
        let line = line?;
        worker.reset_sentence(line);
        worker.tokenize()?;
        match args.output_mode {
            OutputMode::Mecab => {
                for t in worker.token_iter() {
                    out.write_all(t.surface().as_bytes())?;
                    out.write_all(b"\t")?;
                    out.write_all(t.feature().as_bytes())?;
                    out.write_all(b"\n")?;
                }
                out.write_all(b"EOS\n")?;
            }
            OutputMode::Wakati => {
                for (i, t) in worker.token_iter().enumerate() {
                    if i != 0 {
                        out.write_all(b" ")?;
                    }
                    out.write_all(t.surface().as_bytes())?;
                }
                out.write_all(b"\n")?;
            }
            OutputMode::Detail => {
                for t in worker.token_iter() {
                    writeln!(
                        &mut out,
                        "{}\t{}\tlex_type={:?}\tleft_id={}\tright_id={}\tword_cost={}\ttotal_cost={}",
                        t.surface(),
                        t.feature(),
                        t.lex_type(),
                        t.left_id(),
                        t.right_id(),
                        t.word_cost(),
                        t.total_cost(),
                    )?;
                }
                out.write_all(b"EOS\n")?;
            }
            OutputMode::Json => {
                serde_json::to_writer(&mut out, &worker.token_bufs())?;
                out.write_all(b"\n")?;
            }
        }
        if is_tty {
            out.flush()?;
        }
    }

    Ok(())
}
