//! トークン化のための辞書モジュール。
//!
//! このモジュールは、形態素解析に必要な辞書データの読み込み、構築、管理を行います。
//! 主な機能として以下を提供します:
//!
//! - レガシーエンコーディングの辞書ソースの正規化([`source`])
//! - 正規化済みソースからのバイナリアーティファクトの構築([`SystemDictionaryBuilder`])
//! - メモリマップドファイルによるアーティファクトの読み込みと検証
//! - Zstandard圧縮辞書の透過的な展開とキャッシング
//! - プロセス全体で共有される辞書ハンドル([`shared`])
//!
//! # 辞書の読み込み方法
//!
//! - [`Dictionary::from_path`]: ファイルパスから辞書を読み込む(推奨)
//! - [`Dictionary::read`]: リーダーから辞書を読み込む
//! - [`Dictionary::from_zstd`]: Zstandard圧縮辞書を読み込む
//!
//! # アーティファクトの形式
//!
//! ```text
//! MODEL_MAGIC | 0xFF padding (16バイト境界まで) | rkyv archive of DictionaryInner
//! ```
pub mod builder;
pub(crate) mod character;
pub(crate) mod connector;
pub(crate) mod lexicon;
pub mod shared;
pub mod source;
pub(crate) mod unknown;
pub(crate) mod word_idx;

use std::fs::{File, Metadata, create_dir_all};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rkyv::rancor::Error;
use rkyv::util::AlignedVec;
use rkyv::{
    Archive, Deserialize, Serialize, access, access_unchecked, api::serialize_using,
    ser::Serializer, ser::allocator::Arena, ser::sharing::Share, ser::writer::IoWriter,
    util::with_arena,
};
use sha2::{Digest, Sha256};

use crate::common::DEFAULT_CATEGORY;
use crate::dictionary::character::CharProperty;
use crate::dictionary::connector::{ConnectorView, MatrixConnector};
use crate::dictionary::lexicon::Lexicon;
use crate::dictionary::unknown::UnkHandler;
use crate::errors::{MorphError, Result};

pub use crate::dictionary::builder::SystemDictionaryBuilder;
pub use crate::dictionary::word_idx::WordIdx;

pub(crate) use crate::dictionary::lexicon::WordParam;

/// 辞書アーティファクトを識別するマジックバイト。
///
/// "0.1"はアーティファクト形式のバージョンで、クレートのバージョンとは独立しています。
pub const MODEL_MAGIC: &[u8] = b"ReadMakerMorphDict 0.1\n";

/// Zstandardフレームのマジックバイト
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

const MODEL_MAGIC_LEN: usize = MODEL_MAGIC.len();
const RKYV_ALIGNMENT: usize = 16;
const PADDING_LEN: usize = (RKYV_ALIGNMENT - (MODEL_MAGIC_LEN % RKYV_ALIGNMENT)) % RKYV_ALIGNMENT;
const DATA_START: usize = MODEL_MAGIC_LEN + PADDING_LEN;

/// 検証済みであることを示すプルーフファイルを置くディレクトリ名
const CACHE_DIR_NAME: &str = ".cache";

/// 辞書の読み込みモード。
///
/// 辞書ファイルを読み込む際の検証戦略を指定します。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// 読み込むたびにrkyvのバイト検証を実行します。
    ///
    /// キャッシュファイルは作成されません。
    #[default]
    Validate,
    /// 事前計算されたハッシュが一致する場合はバイト検証をスキップします。
    ///
    /// ファイルメタデータに基づくハッシュで検証済みであることを確認します。
    /// プルーフファイルが見つからない場合は完全な検証を行い、成功時に
    /// アーティファクトと同じディレクトリの`.cache`にプルーフファイルを作成します。
    /// ヘッダと本体の整合性検査はどちらのモードでも常に実行されます。
    ///
    /// ファイルが悪意のある攻撃者によって置き換えられる可能性がある環境では
    /// `LoadMode::Validate`を使用してください。
    TrustCache,
}

/// アーティファクトのヘッダ。
///
/// 本体の各構成要素の件数を記録し、読み込み時の整合性検査に使われます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// 辞書語の数
    pub num_entries: u32,
    /// 左接続IDの数
    pub num_left: u32,
    /// 右接続IDの数
    pub num_right: u32,
    /// 文字カテゴリの数
    pub num_categories: u32,
    /// 未知語エントリの数
    pub num_unk_entries: u32,
}

impl ArtifactHeader {
    pub(crate) fn describe(
        lexicon: &Lexicon,
        connector: &MatrixConnector,
        char_prop: &CharProperty,
        unk_handler: &UnkHandler,
    ) -> Result<Self> {
        Ok(Self {
            num_entries: u32::try_from(lexicon.len())?,
            num_left: u32::try_from(connector.num_left())?,
            num_right: u32::try_from(connector.num_right())?,
            num_categories: u32::try_from(char_prop.num_categories())?,
            num_unk_entries: u32::try_from(unk_handler.len())?,
        })
    }
}

/// [`Dictionary`]の内部データ。
///
/// ヘッダ、語彙、接続コスト、文字プロパティ、未知語処理のすべてを含みます。
#[derive(Archive, Serialize, Deserialize)]
pub struct DictionaryInner {
    header: ArtifactHeader,
    lexicon: Lexicon,
    connector: MatrixConnector,
    char_prop: CharProperty,
    unk_handler: UnkHandler,
}

/// 単語を含む語彙の種類。
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LexType {
    /// システム辞書。
    #[default]
    System,
    /// 未知語。
    ///
    /// 辞書に見つからず、文字カテゴリから生成された単語です。
    Unknown,
}

impl DictionaryInner {
    pub(crate) fn new(
        lexicon: Lexicon,
        connector: MatrixConnector,
        char_prop: CharProperty,
        unk_handler: UnkHandler,
    ) -> Result<Self> {
        let header = ArtifactHeader::describe(&lexicon, &connector, &char_prop, &unk_handler)?;
        Ok(Self {
            header,
            lexicon,
            connector,
            char_prop,
            unk_handler,
        })
    }

    #[inline(always)]
    pub const fn header(&self) -> &ArtifactHeader {
        &self.header
    }

    #[inline(always)]
    pub(crate) const fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    #[inline(always)]
    pub(crate) const fn connector(&self) -> &MatrixConnector {
        &self.connector
    }

    #[inline(always)]
    pub(crate) const fn char_prop(&self) -> &CharProperty {
        &self.char_prop
    }

    #[inline(always)]
    pub(crate) const fn unk_handler(&self) -> &UnkHandler {
        &self.unk_handler
    }

    /// 指定された単語のパラメータを取得します。
    #[inline(always)]
    pub(crate) fn word_param(&self, word_idx: WordIdx) -> WordParam {
        match word_idx.lex_type {
            LexType::System => self.lexicon.word_param(word_idx),
            LexType::Unknown => self.unk_handler.word_param(word_idx),
        }
    }

    /// 指定された単語の素性文字列への参照を取得します。
    #[inline(always)]
    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        match word_idx.lex_type {
            LexType::System => self.lexicon.word_feature(word_idx),
            LexType::Unknown => self.unk_handler.word_feature(word_idx),
        }
    }

    /// ヘッダと本体の整合性を検査します。
    ///
    /// # エラー
    ///
    /// 不整合が見つかった場合に[`MorphError::CorruptArtifact`]を返します。
    pub fn validate(&self) -> Result<()> {
        let header = &self.header;
        let expected = ArtifactHeader::describe(
            &self.lexicon,
            &self.connector,
            &self.char_prop,
            &self.unk_handler,
        )
        .map_err(|e| MorphError::corrupt(e.to_string()))?;
        if *header != expected {
            return Err(MorphError::corrupt(format!(
                "header {header:?} does not match the body {expected:?}"
            )));
        }
        if !self.lexicon.verify_layout() {
            return Err(MorphError::corrupt(
                "lexicon index, parameters and features are inconsistent",
            ));
        }
        if self.connector.data_len()
            != self.connector.num_left() * self.connector.num_right()
        {
            return Err(MorphError::corrupt(
                "matrix data length differs from num_left * num_right",
            ));
        }
        if !self.lexicon.verify(&self.connector) {
            return Err(MorphError::corrupt(
                "lexicon includes connection ids out of the matrix",
            ));
        }
        if !self.unk_handler.verify(&self.connector) {
            return Err(MorphError::corrupt(
                "unknown word entries include connection ids out of the matrix",
            ));
        }
        if self.char_prop.cate_id(DEFAULT_CATEGORY).is_none() || !self.char_prop.verify() {
            return Err(MorphError::corrupt("character table is inconsistent"));
        }
        if !self
            .unk_handler
            .verify_layout(self.char_prop.num_categories())
        {
            return Err(MorphError::corrupt(
                "unknown word entries do not cover every character category",
            ));
        }
        Ok(())
    }

    /// 辞書データを`rkyv`フォーマットを使用してライターにシリアライズします。
    ///
    /// 出力は[`Dictionary::from_path`]などの読み込みメソッドが期待する形式です。
    /// 同じ入力からは常に同じバイト列が出力されます。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use std::fs::File;
    /// use readmaker_morph::SystemDictionaryBuilder;
    ///
    /// let dict = SystemDictionaryBuilder::from_readers(
    ///     "東京,1,1,0,名詞,地名\n".as_bytes(),
    ///     "2 2\n".as_bytes(),
    ///     "DEFAULT 0 1 0\n".as_bytes(),
    ///     "DEFAULT,1,1,1000,名詞\n".as_bytes(),
    /// )?;
    ///
    /// let mut file = File::create("system.dic")?;
    /// dict.write(&mut file)?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # エラー
    ///
    /// 書き込みに失敗した場合、または`rkyv`のシリアライズに失敗した場合にエラーを返します。
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MODEL_MAGIC)?;

        let padding_bytes = vec![0xFF; PADDING_LEN];
        wtr.write_all(&padding_bytes)?;

        with_arena(|arena: &mut Arena| {
            let writer = IoWriter::new(&mut wtr);
            let mut serializer = Serializer::new(writer, arena.acquire(), Share::new());
            serialize_using::<_, rkyv::rancor::Error>(self, &mut serializer)
        })
        .map_err(|e| {
            MorphError::invalid_state("rkyv serialization failed".to_string(), e.to_string())
        })?;

        Ok(())
    }
}

/// トークン化のための読み取り専用辞書。
///
/// 読み込み後は変更されず、スレッド間で共有できます。
pub struct Dictionary {
    inner: DictionaryInner,
}

impl Dictionary {
    /// `DictionaryInner`から辞書を作成します。
    pub fn from_inner(inner: DictionaryInner) -> Self {
        Self { inner }
    }

    #[inline(always)]
    pub(crate) const fn inner(&self) -> &DictionaryInner {
        &self.inner
    }

    /// アーティファクトのヘッダ
    #[inline(always)]
    pub const fn header(&self) -> &ArtifactHeader {
        &self.inner.header
    }

    /// 辞書語の数
    #[inline(always)]
    pub fn num_entries(&self) -> usize {
        self.inner.lexicon.len()
    }

    /// 指定された単語の素性文字列
    #[inline(always)]
    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        self.inner.word_feature(word_idx)
    }

    /// 辞書データをライターにシリアライズします。
    ///
    /// [`DictionaryInner::write`]を参照してください。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        self.inner.write(wtr)
    }

    /// すべてのデータをメモリに読み込むことで、リーダーから辞書を作成します。
    ///
    /// Zstandardで圧縮されたデータも受け付けます。
    ///
    /// # エラー
    ///
    /// データを読み込めない場合、またはアーティファクトが破損している場合にエラーを返します。
    pub fn read<R: Read>(mut rdr: R) -> Result<Self> {
        let mut buffer = Vec::new();
        rdr.read_to_end(&mut buffer)?;
        Self::from_bytes(&buffer)
    }

    /// バイト列から辞書を作成します。
    ///
    /// ホストアプリケーションに同梱されたアーティファクトを読み込む場合に使用します。
    ///
    /// # エラー
    ///
    /// マジックバイトが一致しない場合、データが切り詰められている場合、
    /// rkyvの検証やヘッダの整合性検査に失敗した場合に[`MorphError::CorruptArtifact`]を返します。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(&ZSTD_MAGIC) {
            let decompressed = zstd::decode_all(bytes)
                .map_err(|e| MorphError::corrupt(format!("zstd decompression failed: {e}")))?;
            return Self::from_bytes(&decompressed);
        }
        let aligned_bytes = Self::aligned_body(bytes)?;
        let archived = access::<ArchivedDictionaryInner, Error>(&aligned_bytes).map_err(|e| {
            MorphError::corrupt(format!(
                "rkyv validation failed. The dictionary file may be corrupted or incompatible: {e}"
            ))
        })?;
        Self::from_archived(archived)
    }

    /// マジックバイトを検査し、本体をアライメント済みバッファにコピーします。
    fn aligned_body(bytes: &[u8]) -> Result<AlignedVec<RKYV_ALIGNMENT>> {
        if !bytes.starts_with(MODEL_MAGIC) {
            return Err(MorphError::corrupt(
                "The magic number of the input model mismatches.",
            ));
        }
        let Some(data_bytes) = bytes.get(DATA_START..) else {
            return Err(MorphError::corrupt("Dictionary file too small or corrupted."));
        };
        if data_bytes.is_empty() {
            return Err(MorphError::corrupt("Dictionary file too small or corrupted."));
        }
        let mut aligned_bytes = AlignedVec::<RKYV_ALIGNMENT>::with_capacity(data_bytes.len());
        aligned_bytes.extend_from_slice(data_bytes);
        Ok(aligned_bytes)
    }

    fn from_archived(archived: &ArchivedDictionaryInner) -> Result<Self> {
        let inner = rkyv::deserialize::<DictionaryInner, Error>(archived)
            .map_err(|e| MorphError::corrupt(format!("rkyv deserialization failed: {e}")))?;
        inner.validate()?;
        Ok(Self { inner })
    }

    /// メモリマッピングを使用してファイルパスから辞書を作成します。
    ///
    /// ファイルがZstandardで圧縮されている場合は[`Dictionary::from_zstd`]に委譲します。
    ///
    /// | モード | バイト検証 | キャッシュ書き込み |
    /// |------|-------------|---------------|
    /// | `Validate` | 毎回 | なし |
    /// | `TrustCache` | プルーフファイルがあればスキップ | `.cache/<hash>.sha256` |
    ///
    /// # エラー
    ///
    /// - ファイルが存在しない場合は[`MorphError::NotFound`]
    /// - ファイルが破損している場合は[`MorphError::CorruptArtifact`]
    /// - その他の読み込みエラーは[`MorphError::StdIo`]
    pub fn from_path<P: AsRef<Path>>(path: P, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let file = open_artifact(path)?;
        let meta = file.metadata()?;

        // SAFETY: The mapping is read-only and copied into an owned buffer before use.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.starts_with(&ZSTD_MAGIC) {
            drop(mmap);
            return Self::from_zstd(path);
        }

        let aligned_bytes = Self::aligned_body(&mmap)?;
        drop(mmap);

        let proof_path = proof_path(path, &meta);

        if mode == LoadMode::TrustCache
            && let Some(proof_path) = proof_path.as_ref()
            && proof_path.exists()
        {
            log::debug!("Skipped rkyv validation for {path:?}; proof found at {proof_path:?}");
            // SAFETY: The proof file is created only after a successful validation of the
            // file with the same metadata.
            let archived = unsafe { access_unchecked::<ArchivedDictionaryInner>(&aligned_bytes) };
            return Self::from_archived(archived);
        }

        let archived = access::<ArchivedDictionaryInner, Error>(&aligned_bytes).map_err(|e| {
            MorphError::corrupt(format!(
                "rkyv validation failed. The dictionary file may be corrupted or incompatible: {e}"
            ))
        })?;
        let dict = Self::from_archived(archived)?;

        if mode == LoadMode::TrustCache
            && let Some(proof_path) = proof_path
            && let Err(e) = write_proof(&proof_path)
        {
            log::warn!("Failed to write a validation proof to {proof_path:?}: {e}");
        }

        log::info!(
            "Loaded dictionary {path:?} ({} entries)",
            dict.num_entries()
        );
        Ok(dict)
    }

    /// Zstandard圧縮ファイルから辞書を読み込みます。
    ///
    /// 展開結果は圧縮ファイルと同じディレクトリの`.cache`にキャッシュされます。
    /// キャッシュディレクトリを作成できない場合はメモリ上で展開します。
    ///
    /// # エラー
    ///
    /// [`Dictionary::from_zstd_with_options`]を参照してください。
    pub fn from_zstd<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let cache_dir = path
            .parent()
            .map(|parent| parent.join(CACHE_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(CACHE_DIR_NAME));

        if let Err(e) = create_dir_all(&cache_dir) {
            log::warn!("Cache directory {cache_dir:?} is unavailable ({e}); decompressing in memory");
            return Self::read(zstd::Decoder::new(open_artifact(path)?)?);
        }

        Self::from_zstd_with_options(path, cache_dir)
    }

    /// 指定したキャッシュディレクトリを使用してZstandard圧縮ファイルから辞書を読み込みます。
    ///
    /// 圧縮ファイルのメタデータのハッシュを展開後のファイル名として使用します。
    /// 同じハッシュのキャッシュが存在する場合は展開をスキップします。
    ///
    /// # エラー
    ///
    /// - 圧縮ファイルが存在しない場合は[`MorphError::NotFound`]
    /// - 展開に失敗した場合や展開結果が辞書でない場合は[`MorphError::CorruptArtifact`]
    /// - キャッシュディレクトリに書き込めない場合は[`MorphError::StdIo`]
    pub fn from_zstd_with_options<P, Q>(path: P, cache_dir: Q) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let zstd_path = path.as_ref();
        let zstd_file = open_artifact(zstd_path)?;
        let meta = zstd_file.metadata()?;

        let dict_hash = compute_metadata_hash(&meta);
        let decompressed_dir = cache_dir.as_ref().to_path_buf();
        let decompressed_dict_path = decompressed_dir.join(format!("{dict_hash}.dic"));

        if decompressed_dict_path.exists() {
            return Self::from_path(decompressed_dict_path, LoadMode::TrustCache);
        }

        create_dir_all(&decompressed_dir)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&decompressed_dir)?;
        {
            let mut decoder = zstd::Decoder::new(zstd_file)?;
            io::copy(&mut decoder, &mut temp_file)
                .map_err(|e| MorphError::corrupt(format!("zstd decompression failed: {e}")))?;
            temp_file.as_file().sync_all()?;
        }
        temp_file.seek(SeekFrom::Start(0))?;

        let mut data_bytes = Vec::new();
        temp_file.as_file_mut().read_to_end(&mut data_bytes)?;
        let dict = Self::from_bytes(&data_bytes)?;

        temp_file.persist(&decompressed_dict_path)?;
        let meta = File::open(&decompressed_dict_path)?.metadata()?;
        if let Some(proof_path) = proof_path(&decompressed_dict_path, &meta)
            && let Err(e) = write_proof(&proof_path)
        {
            log::warn!("Failed to write a validation proof to {proof_path:?}: {e}");
        }

        log::info!(
            "Decompressed dictionary {zstd_path:?} into {decompressed_dict_path:?}"
        );
        Ok(dict)
    }
}

fn open_artifact(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => MorphError::NotFound(path.to_path_buf()),
        _ => MorphError::StdIo(e),
    })
}

fn proof_path(artifact: &Path, meta: &Metadata) -> Option<PathBuf> {
    let parent = artifact.parent()?;
    let hash = compute_metadata_hash(meta);
    Some(parent.join(CACHE_DIR_NAME).join(format!("{hash}.sha256")))
}

fn write_proof(proof_path: &Path) -> Result<()> {
    if let Some(dir) = proof_path.parent() {
        create_dir_all(dir)?;
    }
    match File::create_new(proof_path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// ファイルメタデータからハッシュを計算します。
///
/// ファイルのメタデータ(サイズ、更新時刻、iノードなど)から
/// SHA256ハッシュを生成します。キャッシュファイルの命名と
/// ファイルの同一性確認に使用されます。
///
/// # プラットフォーム固有の動作
///
/// - Unix: デバイスID、iノード、サイズ、変更時刻を使用
/// - Windows: ファイルサイズ、最終書き込み時刻、作成時刻、ファイル属性を使用
/// - その他: ファイルタイプ、読み取り専用フラグ、サイズ、変更時刻、作成時刻を使用
#[inline(always)]
pub(crate) fn compute_metadata_hash(meta: &Metadata) -> String {
    let mut hasher = Sha256::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        hasher.update(meta.dev().to_le_bytes());
        hasher.update(meta.ino().to_le_bytes());
        hasher.update(meta.size().to_le_bytes());
        hasher.update(meta.mtime().to_le_bytes());
        hasher.update(meta.mtime_nsec().to_le_bytes());
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        hasher.update(meta.file_size().to_le_bytes());
        hasher.update(meta.last_write_time().to_le_bytes());
        hasher.update(meta.creation_time().to_le_bytes());
        hasher.update(meta.file_attributes().to_le_bytes());
    }

    #[cfg(not(any(unix, windows)))]
    {
        use std::time::SystemTime;

        fn update_system_time(time: io::Result<SystemTime>, hasher: &mut Sha256) {
            match time.and_then(|t| {
                t.duration_since(SystemTime::UNIX_EPOCH)
                    .map_err(|_| io::Error::from(io::ErrorKind::Other))
            }) {
                Ok(duration) => {
                    hasher.update(duration.as_secs().to_le_bytes());
                    hasher.update(duration.subsec_nanos().to_le_bytes());
                }
                Err(_) => {
                    hasher.update([0u8; 12]);
                }
            }
        }

        let file_type = meta.file_type();
        let type_byte: u8 = if file_type.is_file() {
            0x01
        } else if file_type.is_dir() {
            0x02
        } else {
            0x00
        };
        hasher.update([type_byte]);
        hasher.update([u8::from(meta.permissions().readonly())]);
        hasher.update(meta.len().to_le_bytes());
        update_system_time(meta.modified(), &mut hasher);
        update_system_time(meta.created(), &mut hasher);
    }

    hex::encode(hasher.finalize())
}
