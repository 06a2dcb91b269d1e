use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

/// 書籍ID - カタログ上の1タイトル（複数冊）を識別する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

/// 利用者ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BorrowerId(Uuid);

impl BorrowerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for BorrowerId {
    fn default() -> Self {
        Self::new()
    }
}

/// メールアドレス
///
/// 利用者の自然キー。比較は大文字小文字を区別しないため、
/// 生成時に前後の空白を除去し小文字へ正規化して保持する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::MissingField("email"));
        }

        // ローカル部とドメイン部が両方あることだけを確認する
        match normalized.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(Self(normalized)),
            _ => Err(ValidationError::MalformedEmail(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 利用者名（空文字不可）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BorrowerName(String);

impl BorrowerName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BorrowerName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BorrowerName> for String {
    fn from(name: BorrowerName) -> Self {
        name.0
    }
}

/// 冊数
///
/// 不変条件：負の値は存在しない。
/// 永続化層（PostgreSQLのINTEGER）との変換時に範囲外の値を拒否する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CopyCount(u32);

impl CopyCount {
    /// 保存できる最大の冊数（PostgreSQLのINTEGERの上限）
    pub const MAX: u32 = i32::MAX as u32;

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// 1冊減らす。0冊の場合は`None`
    pub fn decrement(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    /// 1冊増やす。ただし`ceiling`を超えない
    pub fn increment_up_to(self, ceiling: CopyCount) -> Self {
        Self(self.0.saturating_add(1).min(ceiling.0))
    }
}

impl TryFrom<i32> for CopyCount {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::NegativeQuantity(value as i64))
    }
}

impl TryFrom<i64> for CopyCount {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(ValidationError::NegativeQuantity(value));
        }
        if value > i64::from(Self::MAX) {
            return Err(ValidationError::QuantityOutOfRange {
                value,
                max: Self::MAX,
            });
        }
        // 0 <= value <= i32::MAX
        Ok(Self(value as u32))
    }
}
