use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, CopyCount, ValidationError};

/// 書籍（カタログの1エントリ）
///
/// 不変条件：`0 <= quantity_available <= total_quantity`
///
/// 書誌情報（タイトル、版、出版社、出版年）は貸出管理にとって不透明な属性であり、
/// 検証しない。冊数は同一タイトル内で区別しない（何冊残っているかだけを管理する）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,

    // 書誌情報
    pub title: String,
    pub edition: String,
    pub publisher: String,
    pub publication_year: i32,

    // 在庫
    pub total_quantity: CopyCount,
    pub quantity_available: CopyCount,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 書籍登録の入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub edition: String,
    pub publisher: String,
    pub publication_year: i32,
    pub total_quantity: CopyCount,
    /// 省略時は`total_quantity`と同じ
    pub quantity_available: Option<CopyCount>,
}

/// 書籍更新の入力（指定された項目のみ変更する）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub edition: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub total_quantity: Option<CopyCount>,
    pub quantity_available: Option<CopyCount>,
}

fn ensure_within_total(available: CopyCount, total: CopyCount) -> Result<(), ValidationError> {
    if available > total {
        return Err(ValidationError::AvailableExceedsTotal {
            available: available.value(),
            total: total.value(),
        });
    }
    Ok(())
}

impl Book {
    /// 純粋関数：書籍を登録する
    pub fn register(new_book: NewBook, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let available = new_book
            .quantity_available
            .unwrap_or(new_book.total_quantity);
        ensure_within_total(available, new_book.total_quantity)?;

        Ok(Self {
            book_id: BookId::new(),
            title: new_book.title,
            edition: new_book.edition,
            publisher: new_book.publisher,
            publication_year: new_book.publication_year,
            total_quantity: new_book.total_quantity,
            quantity_available: available,
            created_at: now,
            updated_at: now,
        })
    }

    /// 純粋関数：書籍情報を変更する
    ///
    /// 所蔵冊数の変更で`quantity_available > total_quantity`になる場合は拒否する。
    /// 貸出可能冊数の自動調整は行わない。
    pub fn apply_changes(
        &self,
        changes: BookChanges,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let total_quantity = changes.total_quantity.unwrap_or(self.total_quantity);
        let quantity_available = changes
            .quantity_available
            .unwrap_or(self.quantity_available);
        ensure_within_total(quantity_available, total_quantity)?;

        Ok(Self {
            title: changes.title.unwrap_or_else(|| self.title.clone()),
            edition: changes.edition.unwrap_or_else(|| self.edition.clone()),
            publisher: changes.publisher.unwrap_or_else(|| self.publisher.clone()),
            publication_year: changes.publication_year.unwrap_or(self.publication_year),
            total_quantity,
            quantity_available,
            updated_at: now,
            ..self.clone()
        })
    }

    /// 貸出可能な冊数が残っているか
    pub fn has_copies_available(&self) -> bool {
        !self.quantity_available.is_zero()
    }
}
