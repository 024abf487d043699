use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::BookId;

/// ジャンル。fiction / non-fiction の2値のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Fiction,
    NonFiction,
}

impl Genre {
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "fiction",
            Genre::NonFiction => "non-fiction",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown genre: '{0}' (expected: fiction, non-fiction)")]
pub struct ParseGenreError(pub String);

impl FromStr for Genre {
    type Err = ParseGenreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fiction" => Ok(Genre::Fiction),
            "non-fiction" => Ok(Genre::NonFiction),
            other => Err(ParseGenreError(other.to_string())),
        }
    }
}

/// Book追加リクエスト。IDは持たない（Store側で採番する）。
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub price: f64,
}

/// カタログ上の1レコード。Catalogが所有し、Catalogを通じて変更する。
///
/// フィールド順はバッキングファイルのキー順と一致させている。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    title: String,
    author: String,
    genre: Genre,
    price: f64,
    book_id: BookId,
}

impl Book {
    pub(crate) fn new(id: BookId, req: NewBook) -> Self {
        Self {
            title: req.title,
            author: req.author,
            genre: req.genre,
            price: req.price,
            book_id: id,
        }
    }

    pub fn id(&self) -> &BookId {
        &self.book_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn genre(&self) -> Genre {
        self.genre
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    // --- 内部操作（Catalog経由でのみ呼ばれる） ---

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub(crate) fn set_price(&mut self, price: f64) {
        self.price = price;
    }
}
