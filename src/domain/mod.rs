//! Domain types for the fund pricing and settlement core.
//!
//! This module provides:
//! - Half-up decimal rounding helpers over `rust_decimal`
//! - Identifier newtypes and persisted date/time formats
//! - Fund, Quotaholder, Movement, QuotaHistory, Asset and Receivable records

pub mod decimal;
pub mod fund;
pub mod movement;
pub mod portfolio;
pub mod primitives;
pub mod quota;
pub mod quotaholder;

pub use decimal::{Decimal, DecimalExt, MONEY_DP, QUOTA_DP};
pub use fund::{Fund, FundType, QuotationConvention};
pub use movement::{Movement, MovementKind, MovementStatus};
pub use portfolio::{Asset, ProvisioningUpdate, Receivable, ReceivableStatus};
pub use primitives::{
    local_now, AssetId, Clock, FundId, MovementId, QuotaholderId, ReceivableId, UnknownCode,
};
pub use quota::QuotaHistory;
pub use quotaholder::{PersonType, Qualification, Quotaholder};
