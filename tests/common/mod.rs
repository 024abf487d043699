//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bookstore_mcp::application::service::CatalogService;
use bookstore_mcp::domain::model::book::{Genre, NewBook};
use bookstore_mcp::domain::model::catalog::Catalog;
use bookstore_mcp::domain::repository::CatalogRepository;

// =============================================================================
// InMemoryRepo — テスト用リポジトリ
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("in-memory store error")]
pub struct InMemoryError;

/// ファイルI/O不要のインメモリリポジトリ。
/// cloneは同じ保存領域を共有するので、Serviceに渡した後も中身を確認できる。
#[derive(Clone, Default)]
pub struct InMemoryRepo {
    stored: Rc<RefCell<Option<String>>>,
    fail_saves: Rc<Cell<bool>>,
    saves: Rc<Cell<usize>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降のsaveを失敗させる／戻す。
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    /// 成功したsaveの回数。
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl CatalogRepository for InMemoryRepo {
    type Error = InMemoryError;

    fn load(&self) -> Result<Option<Catalog>, Self::Error> {
        match self.stored.borrow().as_deref() {
            Some(json) => {
                let catalog: Catalog = serde_json::from_str(json).unwrap();
                Ok(Some(catalog))
            }
            None => Ok(None),
        }
    }

    fn save(&self, catalog: &Catalog) -> Result<(), Self::Error> {
        if self.fail_saves.get() {
            return Err(InMemoryError);
        }
        let json = serde_json::to_string(catalog).unwrap();
        *self.stored.borrow_mut() = Some(json);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn new_book(title: &str, author: &str, genre: Genre, price: f64) -> NewBook {
    NewBook {
        title: title.into(),
        author: author.into(),
        genre,
        price,
    }
}

/// 空のInMemoryRepoで開いたServiceと、そのRepoのハンドル。
pub fn empty_service() -> (CatalogService<InMemoryRepo>, InMemoryRepo) {
    let repo = InMemoryRepo::new();
    let svc = CatalogService::open(repo.clone()).unwrap();
    (svc, repo)
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}
