use super::model::catalog::Catalog;

/// 永続化の抽象。Infra層が実装する。
pub trait CatalogRepository {
    type Error: std::error::Error + Send + Sync + 'static;

    /// 保存済みCatalogを読む。未保存ならNone。
    fn load(&self) -> Result<Option<Catalog>, Self::Error>;
    /// Catalog全体で保存先を上書きする。
    fn save(&self, catalog: &Catalog) -> Result<(), Self::Error>;
}
