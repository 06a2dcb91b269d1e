use crate::domain::{ActiveLoan, Book, BookId, Borrower, BorrowerId, BorrowerName, CopyCount, Email};
use crate::ports::book_repository::{self, BookRepository};
use crate::ports::borrower_repository::{self, BorrowerRepository};
use crate::ports::lending_store::{self, LendingStore, LendingUnit};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow, types::Json};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BOOK_COLUMNS: &str = r#"
    book_id,
    title,
    edition,
    publisher,
    publication_year,
    total_quantity,
    quantity_available,
    created_at,
    updated_at
"#;

const BORROWER_COLUMNS: &str = r#"
    borrower_id,
    name,
    email,
    active_loans,
    created_at,
    updated_at
"#;

/// PostgreSQLの行データをBookに変換する
///
/// 冊数はINTEGERで保存されているため、負の値はエラーとして扱う。
fn map_row_to_book(row: &PgRow) -> Result<Book, BoxError> {
    let total_quantity: i32 = row.try_get("total_quantity")?;
    let quantity_available: i32 = row.try_get("quantity_available")?;

    Ok(Book {
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        title: row.try_get("title")?,
        edition: row.try_get("edition")?,
        publisher: row.try_get("publisher")?,
        publication_year: row.try_get("publication_year")?,
        total_quantity: CopyCount::try_from(total_quantity)?,
        quantity_available: CopyCount::try_from(quantity_available)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQLの行データをBorrowerに変換する
///
/// 貸出リストはJSONB配列（`[{"book_id": ..., "issue_date": ...}]`）。
fn map_row_to_borrower(row: &PgRow) -> Result<Borrower, BoxError> {
    let name: String = row.try_get("name")?;
    let email: String = row.try_get("email")?;
    let Json(active_loans): Json<Vec<ActiveLoan>> = row.try_get("active_loans")?;

    Ok(Borrower {
        borrower_id: BorrowerId::from_uuid(row.try_get("borrower_id")?),
        name: BorrowerName::parse(&name)?,
        email: Email::parse(&email)?,
        active_loans,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn to_db_count(count: CopyCount) -> Result<i32, BoxError> {
    Ok(i32::try_from(count.value())?)
}

/// `active_loans @> $1`で使う包含条件
fn holding_filter(book_id: BookId) -> serde_json::Value {
    serde_json::json!([{ "book_id": book_id.value() }])
}

/// 図書館データのPostgreSQL実装
///
/// 貸出・返却は`begin`で開始したトランザクション内で
/// 書籍行・利用者行を`SELECT ... FOR UPDATE`でロックしてから更新する。
/// 参照系（BookRepository / BorrowerRepository）はロックを取らない。
#[derive(Clone)]
pub struct LibraryStore {
    pool: PgPool,
}

impl LibraryStore {
    /// PostgreSQLコネクションプールから新しいLibraryStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// トランザクションを保持する作業単位
///
/// `commit`されずに破棄された場合、sqlxがロールバックする。
pub struct LibraryUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LendingStore for LibraryStore {
    async fn begin(&self) -> lending_store::Result<Box<dyn LendingUnit>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(LibraryUnit { tx }))
    }
}

#[async_trait]
impl LendingUnit for LibraryUnit {
    async fn find_book(&mut self, book_id: BookId) -> lending_store::Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE book_id = $1 FOR UPDATE"
        ))
        .bind(book_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn find_borrower_by_id(
        &mut self,
        borrower_id: BorrowerId,
    ) -> lending_store::Result<Option<Borrower>> {
        let row = sqlx::query(&format!(
            "SELECT {BORROWER_COLUMNS} FROM borrowers WHERE borrower_id = $1 FOR UPDATE"
        ))
        .bind(borrower_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_borrower).transpose()
    }

    async fn find_borrower_by_email(
        &mut self,
        email: &Email,
    ) -> lending_store::Result<Option<Borrower>> {
        let row = sqlx::query(&format!(
            "SELECT {BORROWER_COLUMNS} FROM borrowers WHERE lower(email) = lower($1) FOR UPDATE"
        ))
        .bind(email.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_borrower).transpose()
    }

    async fn find_borrowers_holding(
        &mut self,
        book_id: BookId,
    ) -> lending_store::Result<Vec<Borrower>> {
        let rows = sqlx::query(&format!(
            "SELECT {BORROWER_COLUMNS} FROM borrowers WHERE active_loans @> $1 ORDER BY created_at ASC"
        ))
        .bind(holding_filter(book_id))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_borrower).collect()
    }

    async fn insert_book(&mut self, book: &Book) -> lending_store::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (
                book_id,
                title,
                edition,
                publisher,
                publication_year,
                total_quantity,
                quantity_available,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.edition)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(to_db_count(book.total_quantity)?)
        .bind(to_db_count(book.quantity_available)?)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_borrower(&mut self, borrower: &Borrower) -> lending_store::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO borrowers (
                borrower_id,
                name,
                email,
                active_loans,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(borrower.borrower_id.value())
        .bind(borrower.name.as_str())
        .bind(borrower.email.as_str())
        .bind(Json(&borrower.active_loans))
        .bind(borrower.created_at)
        .bind(borrower.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_borrower_if_absent(
        &mut self,
        borrower: &Borrower,
    ) -> lending_store::Result<Borrower> {
        // 同じメールアドレスの登録が先行している場合、その確定を待ってから何もしない
        let result = sqlx::query(
            r#"
            INSERT INTO borrowers (
                borrower_id,
                name,
                email,
                active_loans,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ((lower(email))) DO NOTHING
            "#,
        )
        .bind(borrower.borrower_id.value())
        .bind(borrower.name.as_str())
        .bind(borrower.email.as_str())
        .bind(Json(&borrower.active_loans))
        .bind(borrower.created_at)
        .bind(borrower.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(borrower.clone());
        }

        let row = sqlx::query(&format!(
            "SELECT {BORROWER_COLUMNS} FROM borrowers WHERE lower(email) = lower($1) FOR UPDATE"
        ))
        .bind(borrower.email.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        map_row_to_borrower(&row)
    }

    async fn save_book(&mut self, book: &Book) -> lending_store::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = $2,
                edition = $3,
                publisher = $4,
                publication_year = $5,
                total_quantity = $6,
                quantity_available = $7,
                updated_at = $8
            WHERE book_id = $1
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.edition)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(to_db_count(book.total_quantity)?)
        .bind(to_db_count(book.quantity_available)?)
        .bind(book.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(format!("book {} does not exist", book.book_id.value()).into());
        }
        Ok(())
    }

    async fn save_borrower(&mut self, borrower: &Borrower) -> lending_store::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE borrowers SET
                name = $2,
                email = $3,
                active_loans = $4,
                updated_at = $5
            WHERE borrower_id = $1
            "#,
        )
        .bind(borrower.borrower_id.value())
        .bind(borrower.name.as_str())
        .bind(borrower.email.as_str())
        .bind(Json(&borrower.active_loans))
        .bind(borrower.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(format!(
                "borrower {} does not exist",
                borrower.borrower_id.value()
            )
            .into());
        }
        Ok(())
    }

    async fn delete_book(&mut self, book_id: BookId) -> lending_store::Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(book_id.value())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_borrower(&mut self, borrower_id: BorrowerId) -> lending_store::Result<bool> {
        let result = sqlx::query("DELETE FROM borrowers WHERE borrower_id = $1")
            .bind(borrower_id.value())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> lending_store::Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl BookRepository for LibraryStore {
    async fn find_by_id(&self, book_id: BookId) -> book_repository::Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE book_id = $1"
        ))
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list(&self) -> book_repository::Result<Vec<Book>> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at ASC, book_id ASC");
        sqlx::query(&query)
            .fetch(&self.pool)
            .map_err(BoxError::from)
            .and_then(|row| async move { map_row_to_book(&row) })
            .try_collect()
            .await
    }
}

#[async_trait]
impl BorrowerRepository for LibraryStore {
    async fn find_by_id(
        &self,
        borrower_id: BorrowerId,
    ) -> borrower_repository::Result<Option<Borrower>> {
        let row = sqlx::query(&format!(
            "SELECT {BORROWER_COLUMNS} FROM borrowers WHERE borrower_id = $1"
        ))
        .bind(borrower_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_borrower).transpose()
    }

    async fn list(&self) -> borrower_repository::Result<Vec<Borrower>> {
        let query =
            format!("SELECT {BORROWER_COLUMNS} FROM borrowers ORDER BY created_at ASC, borrower_id ASC");
        sqlx::query(&query)
            .fetch(&self.pool)
            .map_err(BoxError::from)
            .and_then(|row| async move { map_row_to_borrower(&row) })
            .try_collect()
            .await
    }

    async fn find_holding(&self, book_id: BookId) -> borrower_repository::Result<Vec<Borrower>> {
        let rows = sqlx::query(&format!(
            "SELECT {BORROWER_COLUMNS} FROM borrowers WHERE active_loans @> $1 ORDER BY created_at ASC"
        ))
        .bind(holding_filter(book_id))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_borrower).collect()
    }
}
