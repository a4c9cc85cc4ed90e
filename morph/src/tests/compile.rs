//! レガシーエンコーディングのソースからアーティファクトまでの変換テスト

use std::fs;
use std::path::Path;

use encoding_rs::{EUC_JP, Encoding};
use tempfile::tempdir;

use crate::dictionary::source::SourceNormalizer;
use crate::dictionary::{Dictionary, LoadMode, SystemDictionaryBuilder};
use crate::errors::MorphError;
use crate::tokenizer::Tokenizer;

use super::{CHAR_DEF, LEX_CSV, MATRIX_DEF, UNK_DEF};

fn write_encoded(dir: &Path, name: &str, text: &str, encoding: &'static Encoding) {
    let (bytes, _, had_errors) = encoding.encode(text);
    assert!(!had_errors);
    fs::write(dir.join(name), bytes).unwrap();
}

/// 語彙を品詞ごとのファイルに分け、CRLF改行のEUC-JPで書き出します。
fn write_ipadic_source(dir: &Path) {
    let (nouns, others): (Vec<_>, Vec<_>) =
        LEX_CSV.lines().partition(|line| line.contains(",名詞,"));
    write_encoded(dir, "Noun.csv", &(nouns.join("\r\n") + "\r\n"), EUC_JP);
    write_encoded(dir, "Others.csv", &(others.join("\r\n") + "\r\n"), EUC_JP);
    write_encoded(dir, "matrix.def", MATRIX_DEF, EUC_JP);
    write_encoded(dir, "char.def", CHAR_DEF, EUC_JP);
    write_encoded(dir, "unk.def", UNK_DEF, EUC_JP);
}

#[test]
fn test_compile_euc_jp_source() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_ipadic_source(src.path());

    let report = SourceNormalizer::default()
        .normalize_dir(src.path(), out.path())
        .unwrap();
    assert_eq!(report.total_rows, 11);
    assert_eq!(report.num_skipped(), 0);

    let mut lhs = vec![];
    SystemDictionaryBuilder::from_dir(out.path())
        .unwrap()
        .write(&mut lhs)
        .unwrap();
    let mut rhs = vec![];
    SystemDictionaryBuilder::from_dir(out.path())
        .unwrap()
        .write(&mut rhs)
        .unwrap();
    assert_eq!(lhs, rhs);

    let dict_path = out.path().join("system.dic");
    fs::write(&dict_path, &lhs).unwrap();
    let dict = Dictionary::from_path(&dict_path, LoadMode::Validate).unwrap();
    assert_eq!(dict.num_entries(), 11);

    let tokens = Tokenizer::new(dict).analyze("吾輩は猫である。").unwrap();
    assert_eq!(
        tokens.iter().map(|t| t.surface.as_str()).collect::<Vec<_>>(),
        vec!["吾輩", "は", "猫", "である", "。"]
    );
    assert_eq!(
        tokens[3].feature,
        "助動詞,*,*,*,特殊・ダ,体言接続,だ,デアル,デアル"
    );
}

#[test]
fn test_compile_skips_malformed_rows() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_ipadic_source(src.path());
    write_encoded(src.path(), "Broken.csv", "x,1,2\n", EUC_JP);

    let report = SourceNormalizer::default()
        .normalize_dir(src.path(), out.path())
        .unwrap();
    assert_eq!(report.total_rows, 11);
    assert_eq!(report.num_skipped(), 1);

    let dict = SystemDictionaryBuilder::from_dir(out.path()).unwrap();
    assert_eq!(Dictionary::from_inner(dict).num_entries(), 11);
}

#[test]
fn test_compile_missing_matrix() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_ipadic_source(src.path());
    fs::remove_file(src.path().join("matrix.def")).unwrap();

    let result = SourceNormalizer::default().normalize_dir(src.path(), out.path());
    assert!(matches!(result, Err(MorphError::MissingFile(_))));
}

#[test]
fn test_invalid_encoding() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_ipadic_source(src.path());
    fs::write(src.path().join("Noun.csv"), "猫,1,1,2500,名詞\n").unwrap();

    let result = SourceNormalizer::default().normalize_dir(src.path(), out.path());
    assert!(matches!(result, Err(MorphError::InvalidEncoding { .. })));
}
