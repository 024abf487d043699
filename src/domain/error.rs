use std::fmt;

use super::model::id::BookId;

/// 検索対象。NotFoundがどのキーで失敗したかを示す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(BookId),
    Title(String),
    /// ランダム選択（カタログが空）
    AnyBook,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "id {id}"),
            Lookup::Title(title) => write!(f, "title '{title}'"),
            Lookup::AnyBook => f.write_str("any book (catalog is empty)"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("book not found: {0}")]
    NotFound(Lookup),
}
