use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use super::book::{Book, Genre, NewBook};
use super::id::BookId;
use crate::domain::error::{DomainError, Lookup};

/// Catalog — 集約ルート。挿入順を保持したBookの列で、全操作はここを経由する。
/// JSON上はBookの配列そのもの。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    books: Vec<Book>,
}

/// 読み込んだ配列に同じIDが2回以上現れた。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate book_id: {0}")]
pub struct DuplicateBookId(pub BookId);

impl TryFrom<Vec<Book>> for Catalog {
    type Error = DuplicateBookId;

    /// ID一意性を検証してからCatalogにする。
    fn try_from(books: Vec<Book>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(books.len());
        for book in &books {
            if !seen.insert(book.id()) {
                return Err(DuplicateBookId(book.id().clone()));
            }
        }
        Ok(Self { books })
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let books = Vec::<Book>::deserialize(deserializer)?;
        Catalog::try_from(books).map_err(serde::de::Error::custom)
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全Book（挿入順）
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn find_by_id(&self, id: &BookId) -> Result<&Book, DomainError> {
        self.books
            .iter()
            .find(|b| b.id() == id)
            .ok_or_else(|| DomainError::NotFound(Lookup::Id(id.clone())))
    }

    /// 一様ランダムに1冊選ぶ。空ならNotFound。
    pub fn random_one<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Book, DomainError> {
        self.books
            .choose(rng)
            .ok_or(DomainError::NotFound(Lookup::AnyBook))
    }

    /// Bookを末尾に追加する。IDはここで採番し、既存IDとの衝突は引き直す。
    pub fn add(&mut self, req: NewBook) -> &Book {
        let mut id = BookId::new();
        while self.contains(&id) {
            id = BookId::new();
        }
        self.books.push(Book::new(id, req));
        &self.books[self.books.len() - 1]
    }

    pub fn remove_by_id(&mut self, id: &BookId) -> Result<Book, DomainError> {
        let pos = self
            .books
            .iter()
            .position(|b| b.id() == id)
            .ok_or_else(|| DomainError::NotFound(Lookup::Id(id.clone())))?;
        Ok(self.books.remove(pos))
    }

    /// タイトル完全一致（大文字小文字を区別しない）で最初の1冊を削除する。
    pub fn remove_by_title(&mut self, title: &str) -> Result<Book, DomainError> {
        let needle = title.to_lowercase();
        let pos = self
            .books
            .iter()
            .position(|b| b.title().to_lowercase() == needle)
            .ok_or_else(|| DomainError::NotFound(Lookup::Title(title.to_string())))?;
        Ok(self.books.remove(pos))
    }

    pub fn update_title(&mut self, id: &BookId, title: String) -> Result<(), DomainError> {
        self.find_mut(id)?.set_title(title);
        Ok(())
    }

    pub fn update_price(&mut self, id: &BookId, price: f64) -> Result<(), DomainError> {
        self.find_mut(id)?.set_price(price);
        Ok(())
    }

    /// ジャンル完全一致。該当なしは空Vec。
    pub fn filter_by_genre(&self, genre: Genre) -> Vec<&Book> {
        self.books.iter().filter(|b| b.genre() == genre).collect()
    }

    /// 著者名完全一致（大文字小文字を区別する）。該当なしは空Vec。
    pub fn filter_by_author(&self, author: &str) -> Vec<&Book> {
        self.books.iter().filter(|b| b.author() == author).collect()
    }

    // --- Private helpers ---

    fn contains(&self, id: &BookId) -> bool {
        self.books.iter().any(|b| b.id() == id)
    }

    fn find_mut(&mut self, id: &BookId) -> Result<&mut Book, DomainError> {
        self.books
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or_else(|| DomainError::NotFound(Lookup::Id(id.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_book(title: &str, author: &str, genre: Genre, price: f64) -> NewBook {
        NewBook {
            title: title.into(),
            author: author.into(),
            genre,
            price,
        }
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let json = r#"[
            {"title":"A","author":"X","genre":"fiction","price":1.0,"book_id":"dup"},
            {"title":"B","author":"Y","genre":"non-fiction","price":2.0,"book_id":"dup"}
        ]"#;
        let err = serde_json::from_str::<Catalog>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate book_id: dup"));
    }

    #[test]
    fn try_from_accepts_distinct_ids() {
        let catalog: Catalog = serde_json::from_str(
            r#"[{"title":"A","author":"X","genre":"fiction","price":1.0,"book_id":"a"},
                {"title":"B","author":"Y","genre":"fiction","price":2.0,"book_id":"b"}]"#,
        )
        .unwrap();
        let rebuilt = Catalog::try_from(catalog.books().to_vec()).unwrap();
        assert_eq!(rebuilt, catalog);
    }

    #[test]
    fn add_appends_in_order() {
        let mut catalog = Catalog::new();
        let a = catalog
            .add(new_book("A", "X", Genre::Fiction, 1.0))
            .id()
            .clone();
        let b = catalog
            .add(new_book("B", "Y", Genre::NonFiction, 2.0))
            .id()
            .clone();

        let ids: Vec<&BookId> = catalog.books().iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec![&a, &b]);
        assert_ne!(a, b);
    }

    #[test]
    fn find_by_unknown_id_is_not_found() {
        let mut catalog = Catalog::new();
        catalog.add(new_book("A", "X", Genre::Fiction, 1.0));

        let result = catalog.find_by_id(&BookId::from("nonexistent_id"));
        assert!(matches!(
            result,
            Err(DomainError::NotFound(Lookup::Id(_)))
        ));
    }

    #[test]
    fn random_one_on_empty_catalog() {
        let catalog = Catalog::new();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            catalog.random_one(&mut rng),
            Err(DomainError::NotFound(Lookup::AnyBook))
        ));
    }

    #[test]
    fn random_one_returns_a_member() {
        let mut catalog = Catalog::new();
        for i in 0..5 {
            catalog.add(new_book(&format!("T{i}"), "X", Genre::Fiction, 1.0));
        }
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let picked = catalog.random_one(&mut rng).unwrap();
            assert!(catalog.books().contains(picked));
        }
    }

    #[test]
    fn remove_by_title_is_case_insensitive() {
        let mut catalog = Catalog::new();
        catalog.add(new_book("Dune", "Frank Herbert", Genre::Fiction, 9.99));

        let removed = catalog.remove_by_title("dune").unwrap();
        assert_eq!(removed.title(), "Dune");
        assert!(catalog.is_empty());
    }

    #[test]
    fn remove_by_title_takes_first_match_only() {
        let mut catalog = Catalog::new();
        let first = catalog
            .add(new_book("Emma", "A", Genre::Fiction, 1.0))
            .id()
            .clone();
        let second = catalog
            .add(new_book("EMMA", "B", Genre::Fiction, 2.0))
            .id()
            .clone();

        let removed = catalog.remove_by_title("emma").unwrap();
        assert_eq!(removed.id(), &first);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.books()[0].id(), &second);
    }

    #[test]
    fn remove_by_title_requires_whole_title() {
        let mut catalog = Catalog::new();
        catalog.add(new_book("Dune Messiah", "Frank Herbert", Genre::Fiction, 9.99));

        assert!(matches!(
            catalog.remove_by_title("dune"),
            Err(DomainError::NotFound(Lookup::Title(_)))
        ));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn update_title_keeps_other_fields() {
        let mut catalog = Catalog::new();
        let id = catalog
            .add(new_book("Old", "Author", Genre::NonFiction, 12.5))
            .id()
            .clone();

        catalog.update_title(&id, "New".into()).unwrap();

        let book = catalog.find_by_id(&id).unwrap();
        assert_eq!(book.title(), "New");
        assert_eq!(book.author(), "Author");
        assert_eq!(book.genre(), Genre::NonFiction);
        assert_eq!(book.price(), 12.5);
    }

    #[test]
    fn update_price_on_unknown_id_is_not_found() {
        let mut catalog = Catalog::new();
        assert!(catalog
            .update_price(&BookId::from("missing"), 3.0)
            .is_err());
    }

    #[test]
    fn filter_by_genre_keeps_order() {
        let mut catalog = Catalog::new();
        catalog.add(new_book("F1", "A", Genre::Fiction, 1.0));
        catalog.add(new_book("N1", "A", Genre::NonFiction, 1.0));
        catalog.add(new_book("F2", "A", Genre::Fiction, 1.0));

        let titles: Vec<&str> = catalog
            .filter_by_genre(Genre::Fiction)
            .iter()
            .map(|b| b.title())
            .collect();
        assert_eq!(titles, vec!["F1", "F2"]);
    }

    #[test]
    fn filter_by_author_is_exact_match() {
        let mut catalog = Catalog::new();
        catalog.add(new_book("T1", "Author One", Genre::Fiction, 1.0));
        catalog.add(new_book("T2", "Author", Genre::Fiction, 1.0));
        catalog.add(new_book("T3", "author one", Genre::Fiction, 1.0));

        let titles: Vec<&str> = catalog
            .filter_by_author("Author One")
            .iter()
            .map(|b| b.title())
            .collect();
        assert_eq!(titles, vec!["T1"]);
        assert!(catalog.filter_by_author("Nobody").is_empty());
    }
}
