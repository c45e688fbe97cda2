use serde::{Deserialize, Serialize};

/// Lifecycle status of an exchange.
///
/// The only permitted transitions are:
///
/// ```text
/// Pending --accept--> Accepted --> In Progress --> Completed
/// Pending --decline/revoke--> Cancelled
/// Accepted / In Progress --> Cancelled
/// ```
///
/// `Completed` and `Cancelled` are terminal; nothing moves out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl ExchangeStatus {
    /// The canonical string form, as stored in SQLite and sent over the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parse the canonical string form. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Accepted" => Some(Self::Accepted),
            "In Progress" => Some(Self::InProgress),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind tag on a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Debit from the requester when an exchange is accepted (or completed
    /// without a prior accept).
    Payment,
    /// Credit to the provider on completion, or refund credit to the
    /// requester on cancellation.
    Award,
    /// Manually granted points (sign-up credit, promotions).
    Bonus,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "Payment",
            Self::Award => "Award",
            Self::Bonus => "Bonus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Payment" => Some(Self::Payment),
            "Award" => Some(Self::Award),
            "Bonus" => Some(Self::Bonus),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
