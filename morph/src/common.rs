//! 共通の定数定義
//!
//! トークナイザーと辞書の双方で参照される定数をまとめています。

/// BOS/EOSノードの接続ID
///
/// `matrix.def`の0番目の文脈IDが文頭・文末に対応します。
pub const BOS_EOS_CONNECTION_ID: u16 = 0;

/// BOSノードの開始位置を示す番兵値
pub const BOS_START_POSITION: usize = usize::MAX;

/// 入力テキストに許される最大バイト長
///
/// トークンのバイトオフセットは`u32`で表現されます。
pub const MAX_INPUT_BYTES: usize = u32::MAX as usize;

/// 未知語の長さ指定(`char.def`のLENGTH)の最大値
pub const MAX_UNK_LENGTH: u32 = 15;

/// 文字カテゴリ数の上限
pub const MAX_CATEGORIES: usize = 18;

/// 必ず定義されていなければならない既定カテゴリ名
pub const DEFAULT_CATEGORY: &str = "DEFAULT";

/// 空白カテゴリ名
pub const SPACE_CATEGORY: &str = "SPACE";
