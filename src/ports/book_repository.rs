use crate::domain::{Book, BookId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 書籍の参照ポート
///
/// 行ロックを取らない読み取り専用の経路。
/// 更新は必ず`LendingStore`のトランザクション経由で行う。
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// IDで書籍を取得する
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>>;

    /// 全書籍を登録順に取得する
    async fn list(&self) -> Result<Vec<Book>>;
}
