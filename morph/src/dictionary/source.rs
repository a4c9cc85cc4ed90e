//! 辞書ソースの正規化
//!
//! MeCab IPADICの配布物はEUC-JPなどのレガシーエンコーディングで書かれています。
//! このモジュールはそれらをUTF-8に変換し、複数の語彙CSVを1つの`lex.csv`にまとめ、
//! [`SystemDictionaryBuilder`](crate::SystemDictionaryBuilder)が読める形に整えます。
//!
//! 不正な語彙行はエラーにせず読み飛ばし、[`NormalizeReport`]に記録します。
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::dictionary::builder::{
    CHAR_DEF_FILE, IN_PLACE_SUFFIX, LEXICON_FILE, MATRIX_FILE, UNK_DEF_FILE, in_place_name,
};
use crate::errors::{MorphError, Result};
use crate::utils::parse_csv_row;

/// ソースファイルの既定のエンコーディング
pub const DEFAULT_SOURCE_ENCODING: &str = "EUC-JP";

/// 読み飛ばした語彙行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// ファイル名
    pub file: String,
    /// 1始まりの行番号
    pub line: usize,
    /// 読み飛ばした理由
    pub reason: String,
}

/// 語彙ファイルごとの集計
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileReport {
    pub file: String,
    pub rows: usize,
    pub skipped: usize,
}

/// 正規化の結果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizeReport {
    /// 語彙ファイルごとの集計(ファイル名順)
    pub files: Vec<SourceFileReport>,
    /// `lex.csv`に書き出した行数
    pub total_rows: usize,
    /// 読み飛ばした行
    pub skipped: Vec<SkippedRow>,
}

impl NormalizeReport {
    /// 読み飛ばした行数
    #[inline(always)]
    pub fn num_skipped(&self) -> usize {
        self.skipped.len()
    }
}

/// レガシーエンコーディングの辞書ソースをUTF-8に正規化します。
#[derive(Debug, Clone, Copy)]
pub struct SourceNormalizer {
    encoding: &'static Encoding,
}

impl Default for SourceNormalizer {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::EUC_JP,
        }
    }
}

impl SourceNormalizer {
    /// WHATWGのエンコーディングラベル(`EUC-JP`、`Shift_JIS`、`UTF-8`など)から作成します。
    ///
    /// # エラー
    ///
    /// ラベルが未知の場合にエラーを返します。
    pub fn new(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            MorphError::invalid_argument("encoding", format!("Unknown encoding label: {label}"))
        })?;
        Ok(Self { encoding })
    }

    /// エンコーディング名
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// ファイルを読み込み、UTF-8に変換して改行を`\n`に揃えます。
    ///
    /// # エラー
    ///
    /// - ファイルが存在しない場合は[`MorphError::MissingFile`]
    /// - 復号できないバイト列を含む場合は[`MorphError::InvalidEncoding`]
    pub fn decode_file(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MorphError::MissingFile(path.to_path_buf()),
            _ => MorphError::StdIo(e),
        })?;
        let bytes = if self.encoding == encoding_rs::UTF_8 {
            bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes)
        } else {
            &bytes
        };
        let text = self
            .encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(|| MorphError::InvalidEncoding {
                path: path.to_path_buf(),
                encoding: self.encoding.name(),
            })?;
        Ok(normalize_newlines(&text))
    }

    /// 語彙CSVのテキストを正規化し、`out`に追記します。
    ///
    /// 空行と`#`で始まる行は無視します。列数が4に満たない行、表層形が空の行、
    /// 接続IDやコストが整数として解釈できない行は`report`に記録して読み飛ばします。
    /// 戻り値は書き出した行数です。
    pub fn normalize_lexicon(
        &self,
        file: &str,
        text: &str,
        out: &mut String,
        report: &mut NormalizeReport,
    ) -> usize {
        let mut rows = 0;
        for (i, line) in text.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match normalize_row(line) {
                Ok(row) => {
                    out.push_str(&row);
                    out.push('\n');
                    rows += 1;
                }
                Err(reason) => {
                    log::warn!("Skipped a malformed row at {file}:{}: {reason}", i + 1);
                    report.skipped.push(SkippedRow {
                        file: file.to_string(),
                        line: i + 1,
                        reason,
                    });
                }
            }
        }
        rows
    }

    /// ソースディレクトリを正規化し、`output_dir`に書き出します。
    ///
    /// `*.csv`はファイル名順に連結して`lex.csv`に、`char.def`、`unk.def`、`matrix.def`は
    /// UTF-8に変換してそのまま書き出します。既存の出力は上書きされます。
    ///
    /// `output_dir`が`source_dir`と同じ場合はソースを残すため、`lex_utf8.csv`、
    /// `char_utf8.def`のように接尾辞を付けた名前で書き出します。
    ///
    /// # エラー
    ///
    /// - ソースディレクトリ、定義ファイル、または`*.csv`が存在しない場合は[`MorphError::MissingFile`]
    /// - 復号できないファイルがある場合は[`MorphError::InvalidEncoding`]
    /// - 有効な語彙行が1つもない場合は[`MorphError::InvalidFormat`]
    pub fn normalize_dir<P, Q>(&self, source_dir: P, output_dir: Q) -> Result<NormalizeReport>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let source_dir = source_dir.as_ref();
        let output_dir = output_dir.as_ref();

        let in_place = is_same_dir(source_dir, output_dir);
        let output_name = |name: &str| {
            if in_place {
                in_place_name(name)
            } else {
                name.to_string()
            }
        };

        let lexicon_paths = self.lexicon_files(source_dir)?;
        let def_texts = [CHAR_DEF_FILE, UNK_DEF_FILE, MATRIX_FILE]
            .into_iter()
            .map(|name| Ok((name, self.decode_file(&source_dir.join(name))?)))
            .collect::<Result<Vec<_>>>()?;

        let mut report = NormalizeReport::default();
        let mut lex = String::new();
        for path in &lexicon_paths {
            let file = file_name(path);
            let text = self.decode_file(path)?;
            let skipped_before = report.num_skipped();
            let rows = self.normalize_lexicon(&file, &text, &mut lex, &mut report);
            report.total_rows += rows;
            report.files.push(SourceFileReport {
                file,
                rows,
                skipped: report.num_skipped() - skipped_before,
            });
        }
        if report.total_rows == 0 {
            return Err(MorphError::invalid_format(
                "lex.csv",
                "No valid lexicon rows were found.",
            ));
        }

        fs::create_dir_all(output_dir)?;
        write_atomic(&output_dir.join(output_name(LEXICON_FILE)), &lex)?;
        for (name, text) in &def_texts {
            write_atomic(&output_dir.join(output_name(name)), text)?;
        }

        log::info!(
            "Normalized {} lexicon files from {} ({}): {} rows written, {} rows skipped",
            report.files.len(),
            source_dir.display(),
            self.encoding_name(),
            report.total_rows,
            report.num_skipped(),
        );
        Ok(report)
    }

    /// ソースディレクトリ内の`*.csv`をファイル名順に列挙します。
    ///
    /// 以前に同じディレクトリへ書き出した`lex_utf8.csv`は除外します。
    fn lexicon_files(&self, source_dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(source_dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MorphError::MissingFile(source_dir.to_path_buf()),
            _ => MorphError::StdIo(e),
        })?;

        let mut paths = vec![];
        for entry in entries {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            let is_output = path
                .file_stem()
                .is_some_and(|stem| stem.to_string_lossy().ends_with(IN_PLACE_SUFFIX));
            if is_output {
                continue;
            }
            paths.push(path);
        }
        if paths.is_empty() {
            return Err(MorphError::MissingFile(source_dir.join("*.csv")));
        }
        paths.sort_by_key(|path| file_name(path));
        Ok(paths)
    }
}

/// `surface,left_id,right_id,cost[,features...]`の形の行を検査します。
///
/// 有効な行は列の順序も数値の表記も変えずにそのまま返します。
fn normalize_row(line: &str) -> std::result::Result<String, String> {
    let fields = parse_csv_row(line, "lexicon").map_err(|e| e.to_string())?;
    if fields.len() < 4 {
        return Err(format!(
            "expected at least 4 fields, found {}",
            fields.len()
        ));
    }
    if fields[0].is_empty() {
        return Err("the surface is empty".to_string());
    }
    fields[1]
        .trim()
        .parse::<u16>()
        .map_err(|_| format!("left_id is not an integer: {:?}", fields[1]))?;
    fields[2]
        .trim()
        .parse::<u16>()
        .map_err(|_| format!("right_id is not an integer: {:?}", fields[2]))?;
    fields[3]
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("cost is not an integer: {:?}", fields[3]))?;
    Ok(line.to_string())
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn is_same_dir(lhs: &Path, rhs: &Path) -> bool {
    match (fs::canonicalize(lhs), fs::canonicalize(rhs)) {
        (Ok(lhs), Ok(rhs)) => lhs == rhs,
        _ => false,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    temp_file.write_all(contents.as_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;
    Ok(())
}
