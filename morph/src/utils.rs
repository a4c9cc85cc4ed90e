//! ユーティリティ関数と型変換トレイトを提供するモジュール
//!
//! - `FromU32`: u32からの型変換トレイト
//! - CSV行の分割と引用符処理

use csv_core::ReadFieldResult;

use crate::errors::{MorphError, Result};

/// u32から他の型への変換を提供するトレイト
///
/// 標準ライブラリのFromトレイトとは異なり、プラットフォーム固有の仮定を
/// 行うことができます。
pub trait FromU32 {
    /// u32値から実装型を生成する
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // Since the pointer width is guaranteed to be 32 or 64,
        // the following process always succeeds.
        unsafe { Self::try_from(src).unwrap_unchecked() }
    }
}

/// CSV形式の行をフィールドの生の文字列に分割する
///
/// フィールド全体がダブルクォートで囲まれている場合だけ引用符として扱い、
/// その内部のカンマでは分割しません。それ以外の位置の`"`は通常の文字です。
/// 返すスライスは引用符を含んだままで、カンマで連結すると元の行に戻ります。
///
/// # 例
///
/// ```
/// # use readmaker_morph::utils::split_csv_row;
/// assert_eq!(split_csv_row("\"a,b\",1"), vec!["\"a,b\"", "1"]);
/// assert_eq!(split_csv_row("\",4,4"), vec!["\"", "4", "4"]);
/// ```
pub fn split_csv_row(row: &str) -> Vec<&str> {
    let bytes = row.as_bytes();
    let mut fields = vec![];
    let mut start = 0;
    loop {
        let end = quoted_field_end(bytes, start).unwrap_or_else(|| {
            bytes[start..]
                .iter()
                .position(|&b| b == b',')
                .map_or(bytes.len(), |p| start + p)
        });
        fields.push(&row[start..end]);
        if end >= bytes.len() {
            break;
        }
        start = end + 1;
    }
    fields
}

/// `start`から始まるフィールドが引用符で閉じている場合、その終端の位置を返します。
fn quoted_field_end(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start) != Some(&b'"') {
        return None;
    }
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            // An escaped quote.
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return match bytes.get(i + 1) {
                None | Some(b',') => Some(i + 1),
                Some(_) => None,
            };
        }
        i += 1;
    }
    None
}

/// CSV形式の行を解析してフィールドのベクターに分割する
///
/// 分割の規則は[`split_csv_row`]と同じです。引用符で囲まれたフィールドは
/// 引用符を外し、二重化された`"`を元に戻します。
///
/// # 引数
///
/// * `row` - 解析するCSV形式の文字列
/// * `name` - エラーメッセージに含めるファイル名
///
/// # エラー
///
/// 引用符を外したフィールドがUTF-8として不正な場合にエラーを返します。
///
/// # 例
///
/// ```
/// # use readmaker_morph::utils::parse_csv_row;
/// let fields = parse_csv_row("名詞,\"1,2-ジクロロエタン\"", "lex.csv").unwrap();
/// assert_eq!(fields, vec!["名詞", "1,2-ジクロロエタン"]);
/// ```
pub fn parse_csv_row(row: &str, name: &'static str) -> Result<Vec<String>> {
    split_csv_row(row)
        .into_iter()
        .map(|field| {
            if quoted_field_end(field.as_bytes(), 0) == Some(field.len()) {
                unquote_field(field, name)
            } else {
                Ok(field.to_string())
            }
        })
        .collect()
}

fn unquote_field(field: &str, name: &'static str) -> Result<String> {
    let mut rdr = csv_core::Reader::new();
    let mut output = vec![0; field.len()];
    let (result, _, nout) = rdr.read_field(field.as_bytes(), &mut output);
    match result {
        ReadFieldResult::InputEmpty | ReadFieldResult::End | ReadFieldResult::Field { .. } => {
            Ok(std::str::from_utf8(&output[..nout])?.to_string())
        }
        ReadFieldResult::OutputFull => Err(MorphError::invalid_format(name, "Field too large")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_row() {
        assert_eq!(
            &["名詞", "トスカーナ"],
            parse_csv_row("名詞,トスカーナ", "test").unwrap().as_slice()
        );
    }

    #[test]
    fn test_parse_csv_row_with_quote() {
        assert_eq!(
            &["名詞", "1,2-ジクロロエタン"],
            parse_csv_row("名詞,\"1,2-ジクロロエタン\"", "test").unwrap().as_slice()
        );
    }

    #[test]
    fn test_parse_csv_row_trailing_empty() {
        assert_eq!(
            &["a", ""],
            parse_csv_row("a,", "test").unwrap().as_slice()
        );
    }

    #[test]
    fn test_parse_csv_row_escaped_quote() {
        assert_eq!(
            &["\"", "1", "2", "3"],
            parse_csv_row("\"\"\"\",1,2,3", "test").unwrap().as_slice()
        );
    }

    #[test]
    fn test_bare_quote_is_a_character() {
        assert_eq!(
            &["\"", "4", "4", "10", "記号", "括弧"],
            parse_csv_row("\",4,4,10,記号,括弧", "test").unwrap().as_slice()
        );
        assert_eq!(
            &["a\"b", "1"],
            parse_csv_row("a\"b,1", "test").unwrap().as_slice()
        );
        // The closing quote is not at the end of the field.
        assert_eq!(
            &["\"a\"b", "1"],
            parse_csv_row("\"a\"b,1", "test").unwrap().as_slice()
        );
    }

    #[test]
    fn test_split_csv_row_keeps_raw_text() {
        let row = "\"a,b\",+7,\",x,";
        let fields = split_csv_row(row);
        assert_eq!(fields, vec!["\"a,b\"", "+7", "\"", "x", ""]);
        assert_eq!(fields.join(","), row);
    }
}
