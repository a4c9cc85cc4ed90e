use crate::dictionary::connector::*;

use super::MATRIX_DEF;

/// 接続コスト行列の読み込みと取得機能のテスト
#[test]
fn test_matrix() {
    let conn = MatrixConnector::from_reader(MATRIX_DEF.as_bytes()).unwrap();
    assert_eq!(conn.num_left(), 5);
    assert_eq!(conn.num_right(), 5);
    assert_eq!(conn.data_len(), 25);
    assert_eq!(conn.cost(0, 0), 0);
    assert_eq!(conn.cost(0, 1), -100);
    assert_eq!(conn.cost(1, 2), -500);
    assert_eq!(conn.cost(2, 1), -300);
    assert_eq!(conn.cost(4, 0), -500);
    assert_eq!(conn.cost(4, 4), 600);
}

#[test]
fn test_sparse_matrix() {
    let conn = MatrixConnector::from_reader("3 2\n2 1 -7\n\n0 0 5\n".as_bytes()).unwrap();
    assert_eq!(conn.num_right(), 3);
    assert_eq!(conn.num_left(), 2);
    assert_eq!(conn.cost(0, 0), 5);
    assert_eq!(conn.cost(2, 1), -7);
    assert_eq!(conn.cost(1, 1), 0);
    assert_eq!(conn.cost(2, 0), 0);
}
