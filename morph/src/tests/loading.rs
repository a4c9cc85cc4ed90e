//! 辞書アーティファクトの読み込みに関するテスト
//!
//! 非圧縮とZstandard圧縮のアーティファクトの読み込み、検証済みプルーフの
//! キャッシュ、破損したアーティファクトの検出を検証します。

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

use crate::dictionary::lexicon::WordParam;
use crate::dictionary::{Dictionary, LoadMode, MODEL_MAGIC, SystemDictionaryBuilder};
use crate::errors::MorphError;
use crate::tokenizer::Tokenizer;
use crate::utils::parse_csv_row;

use super::{CHAR_DEF, LEX_CSV, MATRIX_DEF, UNK_DEF, resource_artifact};

const SENTENCE: &str = "吾輩は猫である。";

struct TestEnv {
    _dir: TempDir,
    dict_path: PathBuf,
    zstd_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let artifact = resource_artifact();

        let dict_path = dir.path().join("system.dic");
        fs::write(&dict_path, &artifact).unwrap();

        let zstd_path = dir.path().join("system.dic.zst");
        let compressed = zstd::encode_all(artifact.as_slice(), 3).unwrap();
        fs::write(&zstd_path, compressed).unwrap();

        Self {
            _dir: dir,
            dict_path,
            zstd_path,
        }
    }

    fn cache_dir(&self) -> PathBuf {
        self.dict_path.parent().unwrap().join(".cache")
    }
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return vec![];
    };
    entries
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect()
}

fn assert_tokenizes(dict: Dictionary) {
    let surfaces = Tokenizer::new(dict).analyze_surfaces(SENTENCE).unwrap();
    assert_eq!(surfaces, vec!["吾輩", "は", "猫", "である", "。"]);
}

#[test]
fn test_round_trip() {
    let env = TestEnv::new();
    let dict = Dictionary::from_path(&env.dict_path, LoadMode::Validate).unwrap();
    assert_eq!(dict.num_entries(), 11);
    assert_eq!(dict.header().num_entries, 11);
    assert_eq!(dict.header().num_left, 5);
    assert_eq!(dict.header().num_right, 5);
    assert_eq!(dict.header().num_categories, 8);
    assert_tokenizes(dict);

    assert!(files_with_extension(&env.cache_dir(), "sha256").is_empty());
}

/// 語彙CSVの各行を`(表層形, パラメータ, 素性)`に分解します。
fn lexicon_rows(csv: &str) -> Vec<(String, WordParam, String)> {
    csv.lines()
        .map(|line| {
            let fields = parse_csv_row(line, "lex.csv").unwrap();
            let param = WordParam::new(
                fields[1].parse().unwrap(),
                fields[2].parse().unwrap(),
                fields[3].parse().unwrap(),
            );
            (fields[0].clone(), param, fields[4..].join(","))
        })
        .collect()
}

#[test]
fn test_round_trip_preserves_rows() {
    // Duplicate surfaces share one posting list.
    let lex_csv = format!(
        "{LEX_CSV}猫,4,4,8000,名詞,固有名詞,人名,*,*,*,猫,ネコ,ネコ\n\
         東京,2,3,100,名詞,固有名詞,組織,*,*,*,東京,トウキョウ,トーキョー\n"
    );
    let dict_inner = SystemDictionaryBuilder::from_readers(
        lex_csv.as_bytes(),
        MATRIX_DEF.as_bytes(),
        CHAR_DEF.as_bytes(),
        UNK_DEF.as_bytes(),
    )
    .unwrap();
    let mut artifact = vec![];
    dict_inner.write(&mut artifact).unwrap();

    let dir = tempdir().unwrap();
    let dict_path = dir.path().join("system.dic");
    fs::write(&dict_path, &artifact).unwrap();
    let dict = Dictionary::from_path(&dict_path, LoadMode::Validate).unwrap();

    let rows = lexicon_rows(&lex_csv);
    assert_eq!(rows.len(), 13);
    assert_eq!(dict.num_entries(), rows.len());

    let lexicon = dict.inner().lexicon();
    for (surface, param, feature) in &rows {
        let chars: Vec<_> = surface.chars().collect();
        let matches: Vec<_> = lexicon
            .common_prefix_iterator(&chars)
            .filter(|m| m.end_char == chars.len())
            .collect();
        let num_rows = rows.iter().filter(|(s, _, _)| s == surface).count();
        assert_eq!(matches.len(), num_rows, "{surface}");
        assert!(
            matches
                .iter()
                .any(|m| m.word_param == *param && dict.word_feature(m.word_idx) == feature),
            "{surface} lost {param:?}"
        );
    }
}

#[test]
fn test_read_from_memory() {
    let artifact = resource_artifact();
    assert!(artifact.starts_with(MODEL_MAGIC));
    assert_tokenizes(Dictionary::read(artifact.as_slice()).unwrap());
    assert_tokenizes(Dictionary::from_bytes(&artifact).unwrap());
}

#[test]
fn test_trust_cache() {
    let env = TestEnv::new();

    let dict = Dictionary::from_path(&env.dict_path, LoadMode::TrustCache).unwrap();
    assert_tokenizes(dict);
    let proofs = files_with_extension(&env.cache_dir(), "sha256");
    assert_eq!(proofs.len(), 1);

    // The second load skips byte validation but still passes the header check.
    let dict = Dictionary::from_path(&env.dict_path, LoadMode::TrustCache).unwrap();
    assert_tokenizes(dict);
    assert_eq!(files_with_extension(&env.cache_dir(), "sha256"), proofs);
}

#[test]
fn test_zstd() {
    let env = TestEnv::new();

    let dict = Dictionary::from_path(&env.zstd_path, LoadMode::Validate).unwrap();
    assert_tokenizes(dict);
    let cached = files_with_extension(&env.cache_dir(), "dic");
    assert_eq!(cached.len(), 1);
    assert_eq!(fs::read(&cached[0]).unwrap(), resource_artifact());

    let dict = Dictionary::from_zstd(&env.zstd_path).unwrap();
    assert_tokenizes(dict);
    assert_eq!(files_with_extension(&env.cache_dir(), "dic"), cached);
}

#[test]
fn test_zstd_custom_cache_dir() {
    let env = TestEnv::new();
    let cache_dir = tempdir().unwrap();

    let dict = Dictionary::from_zstd_with_options(&env.zstd_path, cache_dir.path()).unwrap();
    assert_tokenizes(dict);
    assert_eq!(files_with_extension(cache_dir.path(), "dic").len(), 1);
}

#[test]
fn test_zstd_from_memory() {
    let compressed = zstd::encode_all(resource_artifact().as_slice(), 19).unwrap();
    assert_tokenizes(Dictionary::from_bytes(&compressed).unwrap());
}

#[test]
fn test_not_found() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.dic");

    let result = Dictionary::from_path(&path, LoadMode::TrustCache);
    assert!(matches!(result, Err(MorphError::NotFound(p)) if p == path));

    let result = Dictionary::from_zstd(dir.path().join("missing.dic.zst"));
    assert!(matches!(result, Err(MorphError::NotFound(_))));
}

#[test]
fn test_corrupt_file() {
    let env = TestEnv::new();

    fs::write(&env.dict_path, b"this is not a dictionary").unwrap();
    let result = Dictionary::from_path(&env.dict_path, LoadMode::Validate);
    assert!(matches!(result, Err(MorphError::CorruptArtifact(_))));

    fs::write(&env.dict_path, MODEL_MAGIC).unwrap();
    let result = Dictionary::from_path(&env.dict_path, LoadMode::TrustCache);
    assert!(matches!(result, Err(MorphError::CorruptArtifact(_))));
    assert!(files_with_extension(&env.cache_dir(), "sha256").is_empty());
}

#[test]
fn test_corrupt_zstd() {
    let env = TestEnv::new();

    let mut compressed = fs::read(&env.zstd_path).unwrap();
    compressed.truncate(compressed.len() / 2);
    fs::write(&env.zstd_path, compressed).unwrap();

    let result = Dictionary::from_path(&env.zstd_path, LoadMode::Validate);
    assert!(matches!(result, Err(MorphError::CorruptArtifact(_))));
}
