use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BorrowerId};

/// 貸出先の指定方法
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorrowerRef {
    /// 登録済みの利用者
    Existing(BorrowerId),
    /// 連絡先。メールアドレスで検索し、未登録なら貸出と同時に登録する
    Contact { name: String, email: String },
}

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueBook {
    pub book_id: BookId,
    pub borrower: BorrowerRef,
    pub issued_at: DateTime<Utc>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub book_id: BookId,
    pub borrower_id: BorrowerId,
    pub returned_at: DateTime<Utc>,
}
