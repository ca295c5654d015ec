//! Delinquency ratio of a receivables portfolio.

use crate::domain::{Decimal, DecimalExt, Receivable, ReceivableStatus};
use rust_decimal_macros::dec;
use serde::Serialize;

/// Default alert threshold, in percent.
pub const DEFAULT_DELINQUENCY_THRESHOLD_PCT: Decimal = dec!(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelinquencyReport {
    /// Face value of past-due receivables with at least one day overdue.
    pub past_due_face: Decimal,
    /// Face value of not-yet-due plus past-due receivables.
    pub outstanding_face: Decimal,
    /// `past_due_face / outstanding_face * 100`, 2 dp, for display.
    pub ratio_pct: Decimal,
}

impl DelinquencyReport {
    /// Strictly above the threshold, on the exact ratio; a ratio equal to it
    /// does not alert. `ratio_pct` is rounded and is not used here.
    pub fn exceeds(&self, threshold_pct: Decimal) -> bool {
        self.past_due_face * dec!(100) > threshold_pct * self.outstanding_face
    }
}

fn is_overdue(r: &Receivable) -> bool {
    r.status == ReceivableStatus::PastDue && r.days_past_due > 0
}

/// `None` when nothing is overdue or the outstanding face is zero.
pub fn delinquency(receivables: &[Receivable]) -> Option<DelinquencyReport> {
    if !receivables.iter().any(is_overdue) {
        return None;
    }
    let past_due_face: Decimal = receivables
        .iter()
        .filter(|r| is_overdue(r))
        .map(|r| r.face_value)
        .sum();
    let outstanding_face: Decimal = receivables
        .iter()
        .filter(|r| matches!(r.status, ReceivableStatus::NotYetDue | ReceivableStatus::PastDue))
        .map(|r| r.face_value)
        .sum();
    if outstanding_face <= Decimal::ZERO {
        return None;
    }
    Some(DelinquencyReport {
        past_due_face,
        outstanding_face,
        ratio_pct: (past_due_face / outstanding_face * dec!(100)).round_money(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FundId;
    use chrono::NaiveDate;

    fn receivable(face: Decimal, status: ReceivableStatus, days: i64) -> Receivable {
        let due = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        Receivable::new(FundId::new("f-1"), "T", due, face, status, days)
    }

    #[test]
    fn test_no_overdue_receivables_yields_none() {
        let rs = vec![
            receivable(dec!(1000), ReceivableStatus::NotYetDue, 0),
            receivable(dec!(500), ReceivableStatus::PastDue, 0),
        ];
        assert!(delinquency(&rs).is_none());
    }

    #[test]
    fn test_ratio_over_outstanding_face() {
        let rs = vec![
            receivable(dec!(900), ReceivableStatus::NotYetDue, 0),
            receivable(dec!(100), ReceivableStatus::PastDue, 12),
            receivable(dec!(5000), ReceivableStatus::Paid, 0),
        ];
        let report = delinquency(&rs).unwrap();
        assert_eq!(report.past_due_face, dec!(100));
        assert_eq!(report.outstanding_face, dec!(1000));
        assert_eq!(report.ratio_pct, dec!(10.00));
        assert!(report.exceeds(DEFAULT_DELINQUENCY_THRESHOLD_PCT));
    }

    #[test]
    fn test_exactly_at_threshold_does_not_alert() {
        let rs = vec![
            receivable(dec!(950), ReceivableStatus::NotYetDue, 0),
            receivable(dec!(50), ReceivableStatus::PastDue, 3),
        ];
        let report = delinquency(&rs).unwrap();
        assert_eq!(report.ratio_pct, dec!(5.00));
        assert!(!report.exceeds(DEFAULT_DELINQUENCY_THRESHOLD_PCT));
    }

    #[test]
    fn test_just_above_threshold_alerts_despite_rounding() {
        let rs = vec![
            receivable(dec!(94999), ReceivableStatus::NotYetDue, 0),
            receivable(dec!(5001), ReceivableStatus::PastDue, 10),
        ];
        let report = delinquency(&rs).unwrap();
        // 5.001% displays as 5.00 but is still above 5%.
        assert_eq!(report.ratio_pct, dec!(5.00));
        assert!(report.exceeds(DEFAULT_DELINQUENCY_THRESHOLD_PCT));
    }
}
