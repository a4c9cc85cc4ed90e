//! 辞書構築のためのビルダー
//!
//! このモジュールは、正規化済みのIPADIC形式ファイルから [`DictionaryInner`] を構築するための
//! ビルダーを提供します。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::dictionary::DictionaryInner;
use crate::dictionary::character::CharProperty;
use crate::dictionary::connector::MatrixConnector;
use crate::dictionary::lexicon::{Lexicon, RawWordEntry};
use crate::dictionary::unknown::UnkHandler;
use crate::errors::{MorphError, Result};

/// 正規化済みソースディレクトリ内の語彙ファイル名
pub const LEXICON_FILE: &str = "lex.csv";
/// 接続行列ファイル名
pub const MATRIX_FILE: &str = "matrix.def";
/// 文字定義ファイル名
pub const CHAR_DEF_FILE: &str = "char.def";
/// 未知語定義ファイル名
pub const UNK_DEF_FILE: &str = "unk.def";

/// ソースと同じディレクトリに正規化したときに出力名へ付ける接尾辞
pub const IN_PLACE_SUFFIX: &str = "_utf8";

/// `lex.csv`を`lex_utf8.csv`のように、ソースと同じディレクトリに書き出すときの名前に変換します。
pub fn in_place_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}{IN_PLACE_SUFFIX}.{ext}"),
        None => format!("{name}{IN_PLACE_SUFFIX}"),
    }
}

/// システム辞書エントリから [`DictionaryInner`] を構築するビルダー
pub struct SystemDictionaryBuilder {}

impl SystemDictionaryBuilder {
    /// パースされたコンポーネントから `DictionaryInner` を構築します。
    ///
    /// # エラー
    ///
    /// 語彙または未知語エントリに接続行列の範囲外のIDが含まれる場合にエラーを返します。
    pub(crate) fn build(
        system_word_entries: &[RawWordEntry],
        connector: MatrixConnector,
        char_prop: CharProperty,
        unk_handler: UnkHandler,
    ) -> Result<DictionaryInner> {
        let lexicon = Lexicon::from_entries(system_word_entries)?;

        if !lexicon.verify(&connector) {
            return Err(MorphError::invalid_argument(
                "system_lexicon_rdr",
                "system_lexicon_rdr includes invalid connection ids.",
            ));
        }
        if !unk_handler.verify(&connector) {
            return Err(MorphError::invalid_argument(
                "unk_handler_rdr",
                "unk_handler_rdr includes invalid connection ids.",
            ));
        }

        let dict = DictionaryInner::new(lexicon, connector, char_prop, unk_handler)?;
        log::info!(
            "Built a dictionary: {} entries, {} surfaces, matrix {}x{}, {} categories",
            dict.header().num_entries,
            dict.lexicon().num_surfaces(),
            dict.header().num_right,
            dict.header().num_left,
            dict.header().num_categories,
        );
        Ok(dict)
    }

    /// UTF-8のIPADIC形式ファイルから新しい [`DictionaryInner`] を作成します。
    ///
    /// # 引数
    ///
    ///  - `system_lexicon_rdr`: 語彙ファイル `lex.csv` のリーダー
    ///  - `connector_rdr`: 接続行列ファイル `matrix.def` のリーダー
    ///  - `char_prop_rdr`: 文字定義ファイル `char.def` のリーダー
    ///  - `unk_handler_rdr`: 未知語定義ファイル `unk.def` のリーダー
    ///
    /// # エラー
    ///
    /// 入力フォーマットが不正な場合、接続IDが範囲外の場合、
    /// `DEFAULT`カテゴリの未知語エントリがない場合に [`MorphError`] を返します。
    pub fn from_readers<S, C, P, U>(
        mut system_lexicon_rdr: S,
        connector_rdr: C,
        char_prop_rdr: P,
        unk_handler_rdr: U,
    ) -> Result<DictionaryInner>
    where
        S: Read,
        C: Read,
        P: Read,
        U: Read,
    {
        let mut system_lexicon_buf = vec![];
        system_lexicon_rdr.read_to_end(&mut system_lexicon_buf)?;
        let system_lexicon_text = std::str::from_utf8(&system_lexicon_buf)?;
        let system_word_entries = Lexicon::parse_csv(system_lexicon_text, LEXICON_FILE)?;
        let connector = MatrixConnector::from_reader(connector_rdr)?;
        let char_prop = CharProperty::from_reader(char_prop_rdr)?;
        let unk_handler = UnkHandler::from_reader(unk_handler_rdr, &char_prop)?;

        Self::build(&system_word_entries, connector, char_prop, unk_handler)
    }

    /// 正規化済みソースディレクトリから新しい [`DictionaryInner`] を作成します。
    ///
    /// ディレクトリには `lex.csv`、`matrix.def`、`char.def`、`unk.def` が必要です。
    /// `lex_utf8.csv` のようにソースと同じディレクトリへ正規化したファイルがあれば、
    /// そちらを優先して読み込みます。
    ///
    /// # エラー
    ///
    /// ファイルが存在しない場合は [`MorphError::MissingFile`] を返します。
    /// それ以外は [`from_readers()`](Self::from_readers) と同じです。
    pub fn from_dir<P>(dir: P) -> Result<DictionaryInner>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        let open = |name: &str| {
            let in_place = dir.join(in_place_name(name));
            let path = if in_place.is_file() {
                in_place
            } else {
                dir.join(name)
            };
            File::open(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MorphError::MissingFile(path),
                _ => MorphError::StdIo(e),
            })
        };
        Self::from_readers(
            open(LEXICON_FILE)?,
            open(MATRIX_FILE)?,
            open(CHAR_DEF_FILE)?,
            open(UNK_DEF_FILE)?,
        )
    }
}
