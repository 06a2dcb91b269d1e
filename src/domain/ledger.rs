use chrono::{DateTime, Utc};

use super::{ActiveLoan, Book, Borrower, IssueBookError, ReturnBookError};

/// 純粋関数：書籍に貸出可能な冊数が残っているか確認する
///
/// 利用者の解決（検索・自動登録）より前に判定する必要があるため、
/// `issue_book`とは別に公開している。
pub fn ensure_copies_available(book: &Book) -> Result<(), IssueBookError> {
    if !book.has_copies_available() {
        return Err(IssueBookError::NoCopiesAvailable);
    }
    Ok(())
}

/// 純粋関数：書籍を貸し出す
///
/// ビジネスルール（この順で判定し、最初の違反を返す）：
/// - 貸出可能な冊数が1冊以上あること
/// - 利用者の貸出中の冊数が上限（2冊）未満であること
/// - 利用者が同じ書籍をまだ借りていないこと
///
/// 副作用なし。すべての判定を通過した場合のみ、
/// 貸出可能冊数を1減らした書籍と、貸出を1件追加した利用者を返す。
pub fn issue_book(
    book: &Book,
    borrower: &Borrower,
    issued_at: DateTime<Utc>,
) -> Result<(Book, Borrower), IssueBookError> {
    ensure_copies_available(book)?;

    if !borrower.can_borrow() {
        return Err(IssueBookError::LoanLimitReached);
    }

    if borrower.holds(book.book_id) {
        return Err(IssueBookError::DuplicateLoan);
    }

    let quantity_available = book
        .quantity_available
        .decrement()
        .ok_or(IssueBookError::NoCopiesAvailable)?;

    let new_book = Book {
        quantity_available,
        updated_at: issued_at,
        ..book.clone()
    };

    let mut active_loans = borrower.active_loans.clone();
    active_loans.push(ActiveLoan {
        book_id: book.book_id,
        issue_date: issued_at,
    });

    let new_borrower = Borrower {
        active_loans,
        updated_at: issued_at,
        ..borrower.clone()
    };

    Ok((new_book, new_borrower))
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - 利用者がその書籍を借りていること
/// - 貸出可能冊数は1増えるが、所蔵冊数を超えない（二重返却やデータ不整合への備え）
///
/// 副作用なし。更新後の書籍と利用者を返す。
pub fn return_book(
    book: &Book,
    borrower: &Borrower,
    returned_at: DateTime<Utc>,
) -> Result<(Book, Borrower), ReturnBookError> {
    if !borrower.holds(book.book_id) {
        return Err(ReturnBookError::LoanNotFound);
    }

    let new_book = Book {
        quantity_available: book.quantity_available.increment_up_to(book.total_quantity),
        updated_at: returned_at,
        ..book.clone()
    };

    let new_borrower = Borrower {
        active_loans: borrower
            .active_loans
            .iter()
            .filter(|loan| loan.book_id != book.book_id)
            .cloned()
            .collect(),
        updated_at: returned_at,
        ..borrower.clone()
    };

    Ok((new_book, new_borrower))
}
