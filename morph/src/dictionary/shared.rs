//! プロセス全体で共有される辞書ハンドル
//!
//! 辞書の読み込みは重い処理なので、プロセス内で一度だけ行い、以降は
//! `Arc<Dictionary>`を共有します。
//!
//! - 最初の呼び出し元が読み込みを行い、同時に呼び出した他のスレッドは
//!   その読み込みの完了を待ちます。
//! - 読み込みに失敗した場合はハンドルは空のまま残り、後の呼び出しで再試行できます。
//!   [`SharedDictionary::get_or_init_throttled`]は直前の失敗から一定時間、再試行を控えます。
//!
//! ```no_run
//! use readmaker_morph::LoadMode;
//! use readmaker_morph::dictionary::shared;
//!
//! let dict = shared::get_or_init("dictionaries/ipadic.dic", LoadMode::Validate)?;
//! assert!(shared::get().is_some());
//! # Ok::<(), readmaker_morph::errors::MorphError>(())
//! ```
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use crate::dictionary::{Dictionary, LoadMode};
use crate::errors::{MorphError, Result};

struct LoadFailure {
    at: Instant,
    message: String,
}

/// 一度だけ初期化される辞書ハンドル
pub struct SharedDictionary {
    cell: OnceLock<Arc<Dictionary>>,
    init_lock: Mutex<()>,
    loads: AtomicUsize,
    last_failure: Mutex<Option<LoadFailure>>,
}

impl Default for SharedDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedDictionary {
    /// 空のハンドルを作成します。
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init_lock: Mutex::new(()),
            loads: AtomicUsize::new(0),
            last_failure: Mutex::new(None),
        }
    }

    /// 読み込み済みの辞書を返します。
    #[inline(always)]
    pub fn get(&self) -> Option<Arc<Dictionary>> {
        self.cell.get().cloned()
    }

    /// 辞書を返します。まだ読み込まれていなければ`path`から読み込みます。
    ///
    /// # エラー
    ///
    /// 読み込みに失敗した場合は[`Dictionary::from_path`]のエラーを返します。
    /// ハンドルは空のまま残ります。
    pub fn get_or_init<P>(&self, path: P, mode: LoadMode) -> Result<Arc<Dictionary>>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        self.get_or_init_with(|| Dictionary::from_path(path, mode))
    }

    /// 辞書を返します。まだ読み込まれていなければ`load`を呼び出して初期化します。
    ///
    /// `load`が同時に複数回実行されることはありません。
    pub fn get_or_init_with<F>(&self, load: F) -> Result<Arc<Dictionary>>
    where
        F: FnOnce() -> Result<Dictionary>,
    {
        if let Some(dict) = self.get() {
            return Ok(dict);
        }

        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(dict) = self.get() {
            return Ok(dict);
        }

        self.loads.fetch_add(1, Ordering::Relaxed);
        let result = load();
        let mut last_failure = self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(dict) => {
                *last_failure = None;
                let dict = Arc::new(dict);
                Ok(Arc::clone(self.cell.get_or_init(|| dict)))
            }
            Err(e) => {
                *last_failure = Some(LoadFailure {
                    at: Instant::now(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// [`get_or_init`](Self::get_or_init)と同じですが、直前の読み込みが`interval`以内に
    /// 失敗していれば、読み込みを行わずにエラーを返します。
    ///
    /// # エラー
    ///
    /// 再試行を控えた場合は[`MorphError::InvalidState`]を返します。
    pub fn get_or_init_throttled<P>(
        &self,
        path: P,
        mode: LoadMode,
        interval: Duration,
    ) -> Result<Arc<Dictionary>>
    where
        P: AsRef<Path>,
    {
        if let Some(dict) = self.get() {
            return Ok(dict);
        }
        {
            let last_failure = self
                .last_failure
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(failure) = last_failure.as_ref()
                && failure.at.elapsed() < interval
            {
                return Err(MorphError::invalid_state(
                    "the previous dictionary load failed; not retrying yet",
                    failure.message.clone(),
                ));
            }
        }
        self.get_or_init(path, mode)
    }

    /// 構築済みの辞書を設置します。
    ///
    /// すでに辞書が設置されている場合は何もせず、既存の辞書を返します。
    pub fn install(&self, dict: Dictionary) -> Arc<Dictionary> {
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(self.cell.get_or_init(|| Arc::new(dict)))
    }

    /// 読み込み処理が実行された回数
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

static GLOBAL: SharedDictionary = SharedDictionary::new();

/// プロセス全体の辞書ハンドル
#[inline(always)]
pub fn global() -> &'static SharedDictionary {
    &GLOBAL
}

/// プロセス全体のハンドルから読み込み済みの辞書を返します。
pub fn get() -> Option<Arc<Dictionary>> {
    GLOBAL.get()
}

/// プロセス全体のハンドルを`path`の辞書で初期化し、辞書を返します。
///
/// [`SharedDictionary::get_or_init`]を参照してください。
pub fn get_or_init<P>(path: P, mode: LoadMode) -> Result<Arc<Dictionary>>
where
    P: AsRef<Path>,
{
    GLOBAL.get_or_init(path, mode)
}

/// プロセス全体のハンドルに構築済みの辞書を設置します。
pub fn install(dict: Dictionary) -> Arc<Dictionary> {
    GLOBAL.install(dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use crate::SystemDictionaryBuilder;
    use crate::errors::MorphError;

    fn build_dict() -> Result<Dictionary> {
        let inner = SystemDictionaryBuilder::from_readers(
            "猫,0,0,10,名詞".as_bytes(),
            "1 1\n0 0 0".as_bytes(),
            "DEFAULT 0 1 0".as_bytes(),
            "DEFAULT,0,0,100,*".as_bytes(),
        )?;
        Ok(Dictionary::from_inner(inner))
    }

    #[test]
    fn test_loads_once() {
        let shared = Arc::new(SharedDictionary::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || shared.get_or_init_with(build_dict).unwrap())
            })
            .collect();
        let dicts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(shared.load_count(), 1);
        assert!(dicts.iter().all(|d| Arc::ptr_eq(d, &dicts[0])));
    }

    #[test]
    fn test_failure_is_not_cached() {
        let shared = SharedDictionary::new();
        let result = shared.get_or_init_with(|| Err(MorphError::corrupt("broken")));
        assert!(result.is_err());
        assert!(shared.get().is_none());

        let dict = shared.get_or_init_with(build_dict).unwrap();
        assert_eq!(dict.num_entries(), 1);
        assert_eq!(shared.load_count(), 2);
    }

    #[test]
    fn test_missing_path() {
        let shared = SharedDictionary::new();
        let dir = tempfile::tempdir().unwrap();
        let result = shared.get_or_init(dir.path().join("none.dic"), LoadMode::Validate);
        assert!(matches!(result, Err(MorphError::NotFound(_))));
        assert!(shared.get().is_none());
    }

    #[test]
    fn test_throttled_retry() {
        let shared = SharedDictionary::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.dic");
        let interval = Duration::from_secs(3600);

        let result = shared.get_or_init_throttled(&path, LoadMode::Validate, interval);
        assert!(matches!(result, Err(MorphError::NotFound(_))));
        assert_eq!(shared.load_count(), 1);

        // Within the interval the file is not touched again.
        let result = shared.get_or_init_throttled(&path, LoadMode::Validate, interval);
        assert!(matches!(result, Err(MorphError::InvalidState(_))));
        assert_eq!(shared.load_count(), 1);

        let result = shared.get_or_init_throttled(&path, LoadMode::Validate, Duration::ZERO);
        assert!(matches!(result, Err(MorphError::NotFound(_))));
        assert_eq!(shared.load_count(), 2);

        // An explicit load always retries and clears the failure.
        shared.get_or_init_with(build_dict).unwrap();
        assert_eq!(shared.load_count(), 3);
        assert!(
            shared
                .get_or_init_throttled(&path, LoadMode::Validate, interval)
                .is_ok()
        );
    }

    #[test]
    fn test_install() {
        let shared = SharedDictionary::new();
        let first = shared.install(build_dict().unwrap());
        let second = shared.install(build_dict().unwrap());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(shared.load_count(), 0);
    }
}
