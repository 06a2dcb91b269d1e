use crate::domain::{BookId, Borrower, BorrowerId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 利用者の参照ポート
#[async_trait]
pub trait BorrowerRepository: Send + Sync {
    /// IDで利用者を取得する
    async fn find_by_id(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>>;

    /// 全利用者を登録順に取得する
    async fn list(&self) -> Result<Vec<Borrower>>;

    /// 指定の書籍を借りている利用者を取得する
    ///
    /// 「この本を誰が借りているか」の表示に使用される。
    async fn find_holding(&self, book_id: BookId) -> Result<Vec<Borrower>>;
}
