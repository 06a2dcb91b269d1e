use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BorrowerId, BorrowerName, Email};

/// 利用者1人あたりの同時貸出上限
pub const MAX_LOANS_PER_BORROWER: usize = 2;

/// 貸出中の1冊
///
/// 書籍への参照（IDのみ）と貸出日。貸出自体は独立した識別子を持たない。
/// ある時点で`(book_id, borrower_id)`は一意になる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLoan {
    pub book_id: BookId,
    pub issue_date: DateTime<Utc>,
}

/// 利用者
///
/// 不変条件：
/// - `active_loans.len() <= MAX_LOANS_PER_BORROWER`
/// - `active_loans`内の`book_id`は重複しない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    pub borrower_id: BorrowerId,
    pub name: BorrowerName,
    pub email: Email,

    /// 貸出順に並ぶ
    pub active_loans: Vec<ActiveLoan>,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Borrower {
    /// 純粋関数：利用者を登録する（貸出なし）
    pub fn register(name: BorrowerName, email: Email, now: DateTime<Utc>) -> Self {
        Self {
            borrower_id: BorrowerId::new(),
            name,
            email,
            active_loans: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// さらに1冊借りられるか
    pub fn can_borrow(&self) -> bool {
        self.active_loans.len() < MAX_LOANS_PER_BORROWER
    }

    /// 指定の書籍を借りているか
    pub fn holds(&self, book_id: BookId) -> bool {
        self.loan_of(book_id).is_some()
    }

    pub fn loan_of(&self, book_id: BookId) -> Option<&ActiveLoan> {
        self.active_loans.iter().find(|loan| loan.book_id == book_id)
    }
}
