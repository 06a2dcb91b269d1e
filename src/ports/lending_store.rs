use crate::domain::{Book, BookId, Borrower, BorrowerId, Email};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出台帳の永続化ポート
///
/// 貸出・返却は書籍と利用者の2件を読み、2件を書く。
/// この4操作を1つの単位として扱うため、操作はすべて`LendingUnit`を通して行う。
#[async_trait]
pub trait LendingStore: Send + Sync {
    /// 新しい作業単位（トランザクション）を開始する
    async fn begin(&self) -> Result<Box<dyn LendingUnit>>;
}

/// 作業単位
///
/// 読み取った書籍・利用者は`commit`または破棄まで他の作業単位から変更されない。
/// `commit`せずに破棄した場合、すべての書き込みは取り消される。
#[async_trait]
pub trait LendingUnit: Send {
    /// IDで書籍を取得し、ロックする
    async fn find_book(&mut self, book_id: BookId) -> Result<Option<Book>>;

    /// IDで利用者を取得し、ロックする
    async fn find_borrower_by_id(&mut self, borrower_id: BorrowerId) -> Result<Option<Borrower>>;

    /// メールアドレス（大文字小文字を区別しない）で利用者を取得し、ロックする
    async fn find_borrower_by_email(&mut self, email: &Email) -> Result<Option<Borrower>>;

    /// 指定の書籍を借りている利用者を取得する
    async fn find_borrowers_holding(&mut self, book_id: BookId) -> Result<Vec<Borrower>>;

    /// 書籍を新規登録する
    async fn insert_book(&mut self, book: &Book) -> Result<()>;

    /// 利用者を新規登録する
    async fn insert_borrower(&mut self, borrower: &Borrower) -> Result<()>;

    /// メールアドレスが未登録の場合に限り利用者を登録する
    ///
    /// 同じメールアドレスの利用者が既に存在する（同時に登録された場合を含む）ときは
    /// 登録せず、その利用者をロックして返す。
    async fn insert_borrower_if_absent(&mut self, borrower: &Borrower) -> Result<Borrower>;

    /// 既存の書籍を上書き保存する
    async fn save_book(&mut self, book: &Book) -> Result<()>;

    /// 既存の利用者を上書き保存する（貸出リストを含む）
    async fn save_borrower(&mut self, borrower: &Borrower) -> Result<()>;

    /// 書籍を削除する。存在しなかった場合は`false`
    async fn delete_book(&mut self, book_id: BookId) -> Result<bool>;

    /// 利用者を削除する。存在しなかった場合は`false`
    async fn delete_borrower(&mut self, borrower_id: BorrowerId) -> Result<bool>;

    /// すべての書き込みを確定する
    async fn commit(self: Box<Self>) -> Result<()>;
}
