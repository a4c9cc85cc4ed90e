//! C ABI
//!
//! React Nativeのネイティブモジュールから呼び出される関数群です。
//! 返された文字列は必ず[`js_free_string`]で解放してください。
//! どの関数もパニックを呼び出し元に伝播させません。

use std::ffi::{CStr, CString, c_char};
use std::panic;
use std::path::PathBuf;
use std::ptr;

use crate::bridge::{Bridge, BridgeConfig, panic_message, words_to_json};
use crate::fallback::FallbackTokenizer;

const BRIDGE_OK_MESSAGE: &str = "ReadMaker Rust Bridge - OK";

/// C文字列をUTF-8の`&str`として借用します。
///
/// # Safety
///
/// `ptr`はNULLであるか、NUL終端された有効な文字列を指している必要があります。
unsafe fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    let c_str = unsafe { CStr::from_ptr(ptr) };
    c_str.to_str().ok()
}

fn into_raw(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// テキストを解析し、単語列のJSON配列を返します。
///
/// 入力がNULLまたは不正なUTF-8の場合はNULLを返します。
/// 辞書が利用できない場合はフォールバック分割の結果を返します。
///
/// # Safety
///
/// `input`はNULLであるか、NUL終端された有効な文字列を指している必要があります。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn js_analyze_text(input: *const c_char) -> *mut c_char {
    // SAFETY: forwarded from the caller.
    let Some(input) = (unsafe { borrow_str(input) }) else {
        return ptr::null_mut();
    };

    let json = match panic::catch_unwind(|| Bridge::from_env().analyze_json(input)) {
        Ok(json) => json,
        Err(payload) => {
            log::error!("bridge panicked: {}", panic_message(payload.as_ref()));
            words_to_json(&FallbackTokenizer::new().split(input))
        }
    };
    into_raw(json)
}

/// [`js_analyze_text`]と[`js_test_bridge`]が返した文字列を解放します。
///
/// # Safety
///
/// `ptr`はNULLであるか、このモジュールの関数が返した未解放のポインタである必要があります。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn js_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        // SAFETY: allocated by CString::into_raw in this module.
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// ブリッジの疎通確認用の固定文字列を返します。
#[unsafe(no_mangle)]
pub extern "C" fn js_test_bridge() -> *mut c_char {
    into_raw(BRIDGE_OK_MESSAGE.to_string())
}

/// 辞書をプロセス全体のハンドルに読み込みます。
///
/// `path`がNULLの場合は`READMAKER_DIC_PATH`または既定のパスを使います。
/// すでに辞書が読み込まれている場合は何もせず`true`を返します。
///
/// # Safety
///
/// `path`はNULLであるか、NUL終端された有効な文字列を指している必要があります。
#[unsafe(no_mangle)]
pub unsafe extern "C" fn js_initialize(path: *const c_char) -> bool {
    let mut config = BridgeConfig::from_env();
    if !path.is_null() {
        // SAFETY: forwarded from the caller.
        match unsafe { borrow_str(path) } {
            Some(path) => config.dict_path = PathBuf::from(path),
            None => return false,
        }
    }

    let result = panic::catch_unwind(|| Bridge::new(config).initialize());
    match result {
        Ok(Ok(dict)) => {
            log::info!("bridge initialized with {} entries", dict.num_entries());
            true
        }
        Ok(Err(e)) => {
            log::warn!("bridge initialization failed: {e}");
            false
        }
        Err(payload) => {
            log::error!(
                "bridge initialization panicked: {}",
                panic_message(payload.as_ref())
            );
            false
        }
    }
}
