//! ラティス（格子）構造の実装モジュール。
//!
//! このモジュールは、形態素解析におけるViterbiアルゴリズムのための
//! ラティス構造を提供します。`ends[i]`は文字位置`i`で終わるノードの列で、
//! 挿入順に並びます。コストが等しい場合は先に登録された先行ノードを選びます。
use crate::common::{BOS_EOS_CONNECTION_ID, BOS_START_POSITION};
use crate::dictionary::LexType;
use crate::dictionary::connector::ConnectorCost;
use crate::dictionary::lexicon::WordParam;
use crate::dictionary::word_idx::WordIdx;
use crate::errors::{MorphError, Result};

const MAX_COST: i32 = i32::MAX;
const INVALID_IDX: u32 = u32::MAX;

/// ラティス内のノード。
///
/// 各ノードは単語の候補を表し、位置情報、接続ID、最小コストなどを保持します。
#[derive(Debug, Clone, Copy)]
pub struct Node {
    /// 単語ID。
    pub word_id: u32,
    /// 語彙の種類。
    pub lex_type: LexType,
    /// ノードの開始位置（文字単位）。スペースを読み飛ばした場合は空白の先頭です。
    pub start_node: usize,
    /// 単語の開始位置（文字単位）。
    pub start_word: usize,
    /// 左側の接続ID。
    pub left_id: u16,
    /// 右側の接続ID。
    pub right_id: u16,
    /// 最小コストを持つ左側ノードの`ends[start_node]`内のインデックス。
    pub min_idx: u32,
    /// BOSからこのノードまでの最小コスト。
    pub min_cost: i32,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            word_id: 0,
            lex_type: LexType::System,
            start_node: 0,
            start_word: 0,
            left_id: 0,
            right_id: 0,
            min_idx: INVALID_IDX,
            min_cost: MAX_COST,
        }
    }
}

impl Node {
    #[inline(always)]
    pub fn word_idx(&self) -> WordIdx {
        WordIdx::new(self.lex_type, self.word_id)
    }
}

/// 1-best解用のラティス構造体。
#[derive(Default)]
pub struct Lattice {
    ends: Vec<Vec<Node>>,
    eos: Option<Node>,
    len_char: usize, // needed for avoiding to free ends
}

impl Lattice {
    /// ラティスをリセットし、新しい文の処理を準備します。
    pub fn reset(&mut self, len_char: usize) {
        Self::reset_vec(&mut self.ends, len_char + 1);
        self.len_char = len_char;
        self.eos = None;
        self.insert_bos();
    }

    fn reset_vec<T>(data: &mut Vec<Vec<T>>, new_len: usize) {
        for v in data.iter_mut() {
            v.clear();
        }
        let cur_len = data.len();
        if cur_len <= new_len {
            data.reserve(new_len - cur_len);
            for _ in cur_len..new_len {
                data.push(Vec::with_capacity(16))
            }
        }
    }

    #[inline(always)]
    pub const fn len_char(&self) -> usize {
        self.len_char
    }

    fn insert_bos(&mut self) {
        self.ends[0].push(Node {
            word_id: u32::MAX,
            lex_type: LexType::default(),
            start_node: BOS_START_POSITION,
            start_word: BOS_START_POSITION,
            left_id: u16::MAX,
            right_id: BOS_EOS_CONNECTION_ID,
            min_idx: INVALID_IDX,
            min_cost: 0,
        });
    }

    /// EOS（文末）ノードを挿入します。
    ///
    /// # エラー
    ///
    /// `start_node`で終わるノードが存在しない場合、[`MorphError::LatticeBroken`]を返します。
    pub fn insert_eos<C>(&mut self, start_node: usize, connector: &C) -> Result<()>
    where
        C: ConnectorCost,
    {
        let (min_idx, min_cost) = self
            .search_min_node(start_node, BOS_EOS_CONNECTION_ID, connector)
            .ok_or(MorphError::LatticeBroken {
                position: start_node,
            })?;
        self.eos = Some(Node {
            word_id: u32::MAX,
            lex_type: LexType::default(),
            start_node,
            start_word: self.len_char(),
            left_id: BOS_EOS_CONNECTION_ID,
            right_id: u16::MAX,
            min_idx,
            min_cost,
        });
        Ok(())
    }

    /// ラティスに新しいノードを挿入します。
    ///
    /// `start_node`で終わるノードが存在しない場合は何もせず`false`を返します。
    ///
    /// # 引数
    ///
    /// * `start_node` - ノードの開始位置
    /// * `start_word` - 単語の開始位置
    /// * `end_word` - 単語の終了位置
    /// * `word_idx` - 単語インデックス
    /// * `word_param` - 単語パラメータ（接続ID、コスト）
    /// * `connector` - 接続コスト計算用のコネクタ
    pub fn insert_node<C>(
        &mut self,
        start_node: usize,
        start_word: usize,
        end_word: usize,
        word_idx: WordIdx,
        word_param: WordParam,
        connector: &C,
    ) -> bool
    where
        C: ConnectorCost,
    {
        debug_assert!(start_node <= start_word);
        debug_assert!(start_word < end_word);
        let Some((min_idx, min_cost)) =
            self.search_min_node(start_node, word_param.left_id, connector)
        else {
            return false;
        };
        self.ends[end_word].push(Node {
            word_id: word_idx.word_id,
            lex_type: word_idx.lex_type,
            start_node,
            start_word,
            left_id: word_param.left_id,
            right_id: word_param.right_id,
            min_idx,
            min_cost: min_cost.saturating_add(word_param.word_cost),
        });
        true
    }

    fn search_min_node<C>(&self, start_node: usize, left_id: u16, connector: &C) -> Option<(u32, i32)>
    where
        C: ConnectorCost,
    {
        let mut best: Option<(u32, i32)> = None;
        for (i, left_node) in self.ends.get(start_node)?.iter().enumerate() {
            let conn_cost = connector.cost(left_node.right_id, left_id);
            let new_cost = left_node.min_cost.saturating_add(conn_cost);
            // Strict comparison keeps the earliest registered node on ties.
            match best {
                Some((_, min_cost)) if new_cost >= min_cost => {}
                _ => best = Some((i as u32, new_cost)),
            }
        }
        best
    }

    /// 指定位置で終わるノードが少なくとも1つ存在するかチェックします。
    #[inline(always)]
    pub fn has_previous_node(&self, i: usize) -> bool {
        self.ends.get(i).is_some_and(|d| !d.is_empty())
    }

    /// 最良パスのノードを文末から順にベクトルに追加します。
    ///
    /// 要素は`(終了位置, ノード)`です。EOSが挿入されていない場合は何もしません。
    pub fn append_top_nodes(&self, top_nodes: &mut Vec<(usize, Node)>) {
        let Some(eos) = self.eos.as_ref() else {
            return;
        };
        let mut end_node = eos.start_node;
        let mut min_idx = eos.min_idx;
        while end_node != 0 {
            let node = &self.ends[end_node][min_idx as usize];
            top_nodes.push((end_node, *node));
            (end_node, min_idx) = (node.start_node, node.min_idx);
        }
    }

    /// EOSノードの累積コスト
    pub fn eos_cost(&self) -> Option<i32> {
        self.eos.map(|eos| eos.min_cost)
    }
}

impl std::fmt::Debug for Lattice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Lattice {{ eos: {:?}, ends: [", &self.eos)?;
        for (i, e) in self.ends[..=self.len_char()].iter().enumerate() {
            writeln!(f, "{i} => {e:?}")?;
        }
        writeln!(f, "]}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dictionary::connector::MatrixConnector;

    fn connector() -> MatrixConnector {
        // right 0..2, left 0..2
        MatrixConnector::new(vec![0, 0, 0, 0], 2, 2).unwrap()
    }

    fn word(id: u32) -> WordIdx {
        WordIdx::new(LexType::System, id)
    }

    #[test]
    fn test_earliest_predecessor_wins_ties() {
        let conn = connector();
        let mut lattice = Lattice::default();
        lattice.reset(2);

        // Two nodes end at position 1 with the same cost.
        assert!(lattice.insert_node(0, 0, 1, word(0), WordParam::new(1, 1, 5), &conn));
        assert!(lattice.insert_node(0, 0, 1, word(1), WordParam::new(1, 1, 5), &conn));
        assert!(lattice.insert_node(1, 1, 2, word(2), WordParam::new(1, 1, 5), &conn));
        lattice.insert_eos(2, &conn).unwrap();

        let mut top_nodes = vec![];
        lattice.append_top_nodes(&mut top_nodes);
        let ids: Vec<_> = top_nodes.iter().rev().map(|(_, n)| n.word_id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(lattice.eos_cost(), Some(10));
    }

    #[test]
    fn test_saturating_cost() {
        let conn = MatrixConnector::new(vec![i32::MAX; 4], 2, 2).unwrap();
        let mut lattice = Lattice::default();
        lattice.reset(2);

        assert!(lattice.insert_node(0, 0, 1, word(0), WordParam::new(1, 1, i32::MAX), &conn));
        assert!(lattice.insert_node(1, 1, 2, word(1), WordParam::new(1, 1, i32::MAX), &conn));
        assert!(lattice.insert_node(0, 0, 2, word(2), WordParam::new(1, 1, i32::MAX), &conn));
        lattice.insert_eos(2, &conn).unwrap();

        let mut top_nodes = vec![];
        lattice.append_top_nodes(&mut top_nodes);
        // Every path saturates; the first registered node ending at 2 is taken.
        assert_eq!(top_nodes.len(), 2);
        assert_eq!(lattice.eos_cost(), Some(i32::MAX));
    }

    #[test]
    fn test_broken_lattice() {
        let conn = connector();
        let mut lattice = Lattice::default();
        lattice.reset(3);

        assert!(lattice.insert_node(0, 0, 1, word(0), WordParam::new(1, 1, 0), &conn));
        assert!(!lattice.insert_node(2, 2, 3, word(1), WordParam::new(1, 1, 0), &conn));
        assert!(matches!(
            lattice.insert_eos(3, &conn),
            Err(MorphError::LatticeBroken { position: 3 })
        ));
    }
}
