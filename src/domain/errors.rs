use thiserror::Error;

/// 入力値のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 必須項目が空
    #[error("{0} is required")]
    MissingField(&'static str),
    /// メールアドレスの形式が不正
    #[error("malformed email address: {0}")]
    MalformedEmail(String),
    /// 冊数が負
    #[error("quantity must not be negative (got {0})")]
    NegativeQuantity(i64),
    /// 冊数が保存できる上限を超えている
    #[error("quantity must not exceed {max} (got {value})")]
    QuantityOutOfRange { value: i64, max: u32 },
    /// 貸出可能冊数が所蔵冊数を超えている
    #[error("quantity available ({available}) exceeds total quantity ({total})")]
    AvailableExceedsTotal { available: u32, total: u32 },
    /// メールアドレスが既に登録されている
    #[error("email already registered: {0}")]
    EmailAlreadyRegistered(String),
    /// 貸出中の書籍は削除できない
    #[error("book is currently on loan")]
    BookOnLoan,
    /// 貸出中の利用者は削除できない
    #[error("borrower still holds active loans")]
    BorrowerHasActiveLoans,
}

/// 貸出のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueBookError {
    /// 貸出可能な冊数が0
    #[error("no copies available")]
    NoCopiesAvailable,
    /// 利用者の貸出上限に達している
    #[error("loan limit reached")]
    LoanLimitReached,
    /// 同じ書籍を既に借りている
    #[error("borrower has already issued this book")]
    DuplicateLoan,
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnBookError {
    /// 利用者がこの書籍を借りていない
    #[error("borrower has not issued this book")]
    LoanNotFound,
}
