use rand::Rng;

use crate::domain::error::DomainError;
use crate::domain::model::book::{Book, Genre, NewBook};
use crate::domain::model::catalog::Catalog;
use crate::domain::model::id::BookId;
use crate::domain::repository::CatalogRepository;

use super::error::AppError;

/// Catalogに対するユースケース。
/// 起動時に1度loadし、以降はメモリ上のCatalogを正とする。
/// 変更系は clone → mutate → save → 差し替え のパターンで操作する。
pub struct CatalogService<R: CatalogRepository> {
    repo: R,
    catalog: Catalog,
}

impl<R: CatalogRepository> CatalogService<R> {
    /// 保存済みCatalogを読み込んでServiceを作る。未保存なら空で始める。
    pub fn open(repo: R) -> Result<Self, AppError> {
        let catalog = repo
            .load()
            .map_err(|e| AppError::Storage(Box::new(e)))?
            .unwrap_or_default();
        tracing::debug!(books = catalog.len(), "catalog loaded");
        Ok(Self { repo, catalog })
    }

    pub fn list_all(&self) -> &[Book] {
        self.catalog.books()
    }

    pub fn count(&self) -> usize {
        self.catalog.len()
    }

    pub fn find_by_id(&self, id: &BookId) -> Result<&Book, AppError> {
        Ok(self.catalog.find_by_id(id)?)
    }

    pub fn random_one(&self) -> Result<&Book, AppError> {
        self.random_one_with(&mut rand::thread_rng())
    }

    /// 乱数源を指定してランダムに1冊選ぶ。
    pub fn random_one_with<G: Rng + ?Sized>(&self, rng: &mut G) -> Result<&Book, AppError> {
        Ok(self.catalog.random_one(rng)?)
    }

    /// Bookを追加して永続化する。作成したBookを返す。
    pub fn add(&mut self, req: NewBook) -> Result<Book, AppError> {
        let book = self.commit(|catalog| Ok(catalog.add(req).clone()))?;
        tracing::info!(book_id = %book.id(), title = book.title(), "book added");
        Ok(book)
    }

    pub fn remove_by_id(&mut self, id: &BookId) -> Result<Book, AppError> {
        let removed = self.commit(|catalog| catalog.remove_by_id(id))?;
        tracing::info!(book_id = %removed.id(), "book removed");
        Ok(removed)
    }

    /// タイトル（大文字小文字無視）で最初の1冊を削除する。
    pub fn remove_by_title(&mut self, title: &str) -> Result<Book, AppError> {
        let removed = self.commit(|catalog| catalog.remove_by_title(title))?;
        tracing::info!(book_id = %removed.id(), title, "book removed by title");
        Ok(removed)
    }

    pub fn update_title(&mut self, id: &BookId, title: String) -> Result<(), AppError> {
        self.commit(|catalog| catalog.update_title(id, title))?;
        tracing::info!(book_id = %id, "book title updated");
        Ok(())
    }

    pub fn update_price(&mut self, id: &BookId, price: f64) -> Result<(), AppError> {
        self.commit(|catalog| catalog.update_price(id, price))?;
        tracing::info!(book_id = %id, price, "book price updated");
        Ok(())
    }

    pub fn filter_by_genre(&self, genre: Genre) -> Vec<&Book> {
        self.catalog.filter_by_genre(genre)
    }

    pub fn filter_by_author(&self, author: &str) -> Vec<&Book> {
        self.catalog.filter_by_author(author)
    }

    // --- private ---

    /// 複製に変更を適用し、保存に成功した場合のみメモリ上のCatalogを差し替える。
    /// 保存失敗時はメモリとファイルの内容が一致したまま残る。
    fn commit<T>(
        &mut self,
        mutate: impl FnOnce(&mut Catalog) -> Result<T, DomainError>,
    ) -> Result<T, AppError> {
        let mut next = self.catalog.clone();
        let out = mutate(&mut next)?;
        self.repo
            .save(&next)
            .map_err(|e| AppError::Storage(Box::new(e)))?;
        self.catalog = next;
        Ok(out)
    }
}
