//! 接続コスト計算のためのコネクター
//!
//! このモジュールは、形態素間の接続コストを計算するための
//! インターフェースと、`matrix.def`に基づく行列コネクターを提供します。

mod matrix_connector;

pub use crate::dictionary::connector::matrix_connector::MatrixConnector;

/// 接続IDの範囲を公開するトレイト
pub trait ConnectorView {
    /// 左接続IDの数を返します。
    fn num_left(&self) -> usize;

    /// 右接続IDの数を返します。
    fn num_right(&self) -> usize;
}

/// 接続コストを計算するトレイト
pub trait ConnectorCost: ConnectorView {
    /// 先行語の右接続IDと後続語の左接続IDから接続コストを返します。
    ///
    /// # 引数
    ///
    /// * `right_id` - 先行語の右接続ID
    /// * `left_id` - 後続語の左接続ID
    fn cost(&self, right_id: u16, left_id: u16) -> i32;
}
