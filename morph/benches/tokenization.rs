//! 形態素解析と辞書読み込みのベンチマーク
//!
//! テスト用の小さな辞書を使い、トークナイザーとフォールバック分割器の速度、
//! および読み込みモードごとの辞書読み込み速度を計測します。

use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use readmaker_morph::{
    Dictionary, FallbackTokenizer, LoadMode, SystemDictionaryBuilder, Tokenizer,
};

const LEX_CSV: &str = include_str!("../src/tests/resources/lex.csv");
const MATRIX_DEF: &str = include_str!("../src/tests/resources/matrix.def");
const CHAR_DEF: &str = include_str!("../src/tests/resources/char.def");
const UNK_DEF: &str = include_str!("../src/tests/resources/unk.def");

const LINES: &[&str] = &[
    "吾輩は猫である。",
    "東京都と京都",
    "吾輩は　猫である。😀",
    "ABCです。テスト123",
    "ReadMakerは速読のためのアプリです。",
];

fn artifact() -> Vec<u8> {
    let dict = SystemDictionaryBuilder::from_readers(
        LEX_CSV.as_bytes(),
        MATRIX_DEF.as_bytes(),
        CHAR_DEF.as_bytes(),
        UNK_DEF.as_bytes(),
    )
    .expect("Failed to build the dictionary");
    let mut buffer = vec![];
    dict.write(&mut buffer).expect("Failed to write the dictionary");
    buffer
}

fn bench_tokenization(c: &mut Criterion) {
    let dict = Arc::new(Dictionary::from_bytes(&artifact()).expect("Failed to load"));
    let total_bytes: usize = LINES.iter().map(|l| l.len()).sum();

    let mut group = c.benchmark_group("Tokenization Speed");
    group.throughput(Throughput::Bytes(total_bytes as u64));
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(5));

    group.bench_function(BenchmarkId::new("Default", "Lines"), |b| {
        b.iter_with_setup(
            || Tokenizer::from_shared_dictionary(dict.clone()).new_worker(),
            |mut worker| {
                for line in LINES {
                    worker.reset_sentence(line);
                    worker.tokenize().expect("Failed to tokenize");
                }
            },
        );
    });

    group.bench_function(BenchmarkId::new("IgnoreSpace", "Lines"), |b| {
        b.iter_with_setup(
            || {
                Tokenizer::from_shared_dictionary(dict.clone())
                    .ignore_space(true)
                    .expect("SPACE must be defined")
                    .max_grouping_len(24)
                    .new_worker()
            },
            |mut worker| {
                for line in LINES {
                    worker.reset_sentence(line);
                    worker.tokenize().expect("Failed to tokenize");
                }
            },
        );
    });

    group.bench_function(BenchmarkId::new("Fallback", "Lines"), |b| {
        let splitter = FallbackTokenizer::new();
        b.iter(|| {
            for line in LINES {
                criterion::black_box(splitter.split(line));
            }
        });
    });

    group.finish();
}

fn bench_loading(c: &mut Criterion) {
    let bytes = artifact();
    let dir = tempfile::tempdir().expect("Failed to create a temporary directory");
    let dict_path = dir.path().join("system.dic");
    std::fs::write(&dict_path, &bytes).expect("Failed to write the dictionary");

    let mut group = c.benchmark_group("Dictionary Loading");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("from_bytes", |b| {
        b.iter(|| Dictionary::from_bytes(&bytes).expect("Failed to load"));
    });
    for (name, mode) in [
        ("Validate", LoadMode::Validate),
        ("TrustCache", LoadMode::TrustCache),
    ] {
        group.bench_function(BenchmarkId::new("from_path", name), |b| {
            b.iter(|| Dictionary::from_path(&dict_path, mode).expect("Failed to load"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tokenization, bench_loading);
criterion_main!(benches);
