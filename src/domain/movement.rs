//! Subscription/redemption movements and their status machine.

use crate::domain::{Decimal, FundId, MovementId, QuotaholderId, UnknownCode};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Metadata key holding the free-form cancellation reason.
pub const CANCELLATION_REASON_KEY: &str = "cancellation_reason";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    /// Subscription: the investor brings an amount of money.
    #[serde(rename = "APLICACAO")]
    Subscription,
    /// Redemption: the investor hands back a number of shares.
    #[serde(rename = "RESGATE")]
    Redemption,
    /// Come-cotas: periodic tax debit settled by removing shares.
    #[serde(rename = "COME_COTAS")]
    PeriodicTaxDebit,
}

impl MovementKind {
    pub fn code(&self) -> &'static str {
        match self {
            MovementKind::Subscription => "APLICACAO",
            MovementKind::Redemption => "RESGATE",
            MovementKind::PeriodicTaxDebit => "COME_COTAS",
        }
    }
}

impl FromStr for MovementKind {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APLICACAO" => Ok(MovementKind::Subscription),
            "RESGATE" => Ok(MovementKind::Redemption),
            "COME_COTAS" => Ok(MovementKind::PeriodicTaxDebit),
            other => Err(UnknownCode::new("movement kind", other)),
        }
    }
}

/// `Requested -> AwaitingPayment -> Confirmed`, `Cancelled` from any
/// non-terminal state. `Confirmed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementStatus {
    #[serde(rename = "SOLICITADO")]
    Requested,
    #[serde(rename = "AGUARDANDO_PAGAMENTO")]
    AwaitingPayment,
    #[serde(rename = "CONFIRMADO")]
    Confirmed,
    #[serde(rename = "CANCELADO")]
    Cancelled,
}

impl MovementStatus {
    pub fn code(&self) -> &'static str {
        match self {
            MovementStatus::Requested => "SOLICITADO",
            MovementStatus::AwaitingPayment => "AGUARDANDO_PAGAMENTO",
            MovementStatus::Confirmed => "CONFIRMADO",
            MovementStatus::Cancelled => "CANCELADO",
        }
    }

    /// Confirmed movements never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MovementStatus::Confirmed)
    }

    /// Whether the status machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: MovementStatus) -> bool {
        use MovementStatus::*;
        match (*self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Cancelled) => true,
            (Requested, AwaitingPayment) => true,
            (Requested, Confirmed) | (AwaitingPayment, Confirmed) => true,
            _ => false,
        }
    }
}

impl FromStr for MovementStatus {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOLICITADO" => Ok(MovementStatus::Requested),
            "AGUARDANDO_PAGAMENTO" => Ok(MovementStatus::AwaitingPayment),
            "CONFIRMADO" => Ok(MovementStatus::Confirmed),
            "CANCELADO" => Ok(MovementStatus::Cancelled),
            other => Err(UnknownCode::new("movement status", other)),
        }
    }
}

impl std::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A subscription or redemption request and, once settled, its outcome.
///
/// Subscriptions carry `amount` on request and receive `share_count` on
/// settlement; redemptions carry `share_count` on request and receive
/// `amount` (gross value), taxes and `net_value` on settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: MovementId,
    pub kind: MovementKind,
    pub fund_id: FundId,
    pub quotaholder_id: QuotaholderId,
    pub requested_at: NaiveDateTime,
    pub quotation_date: NaiveDate,
    pub settlement_date: NaiveDate,
    pub amount: Option<Decimal>,
    pub share_price: Option<Decimal>,
    pub share_count: Option<Decimal>,
    pub income_tax: Decimal,
    pub transaction_tax: Decimal,
    pub net_value: Option<Decimal>,
    pub status: MovementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Movement {
    pub fn is_confirmed(&self) -> bool {
        self.status == MovementStatus::Confirmed
    }

    /// Cancellation reason recorded in metadata, if any.
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(CANCELLATION_REASON_KEY))
            .and_then(|v| v.as_str())
    }

    /// Record a cancellation reason, preserving any other metadata keys.
    pub fn set_cancellation_reason(&mut self, reason: &str) {
        let mut meta = match self.metadata.take() {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        meta.insert(
            CANCELLATION_REASON_KEY.to_string(),
            serde_json::Value::String(reason.to_string()),
        );
        self.metadata = Some(serde_json::Value::Object(meta));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Movement {
        let day = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        Movement {
            id: MovementId::new("m-1"),
            kind: MovementKind::Subscription,
            fund_id: FundId::new("f-1"),
            quotaholder_id: QuotaholderId::new("q-1"),
            requested_at: day.and_hms_opt(10, 0, 0).unwrap(),
            quotation_date: day,
            settlement_date: day,
            amount: Some(dec!(1000)),
            share_price: None,
            share_count: None,
            income_tax: Decimal::ZERO,
            transaction_tax: Decimal::ZERO,
            net_value: None,
            status: MovementStatus::AwaitingPayment,
            metadata: None,
        }
    }

    #[test]
    fn test_confirmed_is_terminal() {
        assert!(MovementStatus::Confirmed.is_terminal());
        for next in [
            MovementStatus::Requested,
            MovementStatus::AwaitingPayment,
            MovementStatus::Cancelled,
        ] {
            assert!(!MovementStatus::Confirmed.can_transition_to(next));
        }
    }

    #[test]
    fn test_is_confirmed_follows_status() {
        let mut m = sample();
        assert!(!m.is_confirmed());
        m.status = MovementStatus::Confirmed;
        assert!(m.is_confirmed());
    }

    #[test]
    fn test_pending_states_can_be_cancelled() {
        assert!(MovementStatus::Requested.can_transition_to(MovementStatus::Cancelled));
        assert!(MovementStatus::AwaitingPayment.can_transition_to(MovementStatus::Cancelled));
        assert!(!MovementStatus::AwaitingPayment.can_transition_to(MovementStatus::Requested));
    }

    #[test]
    fn test_status_codes_roundtrip() {
        for s in [
            MovementStatus::Requested,
            MovementStatus::AwaitingPayment,
            MovementStatus::Confirmed,
            MovementStatus::Cancelled,
        ] {
            assert_eq!(s.code().parse::<MovementStatus>().unwrap(), s);
            assert_eq!(serde_json::to_value(s).unwrap(), s.code());
        }
    }

    #[test]
    fn test_cancellation_reason_preserves_other_metadata() {
        let mut m = sample();
        m.metadata = Some(serde_json::json!({"channel": "api"}));
        m.set_cancellation_reason("investor request");
        assert_eq!(m.cancellation_reason(), Some("investor request"));
        assert_eq!(m.metadata.as_ref().unwrap()["channel"], "api");
    }
}
