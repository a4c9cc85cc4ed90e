//! 単語識別子

use crate::dictionary::LexType;

/// 単語の識別子
///
/// 語彙の種類と、その語彙内での単語IDの組です。
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct WordIdx {
    /// この単語を含む語彙の種類
    pub lex_type: LexType,

    /// この単語のID
    pub word_id: u32,
}

impl Default for WordIdx {
    fn default() -> Self {
        Self::new(LexType::System, u32::MAX)
    }
}

impl WordIdx {
    #[inline(always)]
    pub(crate) const fn new(lex_type: LexType, word_id: u32) -> Self {
        Self { lex_type, word_id }
    }
}
