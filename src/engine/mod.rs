//! Pure computation for pricing, taxation and scheduling.
//!
//! Nothing in here touches the database; services load inputs, call into
//! these modules and persist the results.

pub mod calendar;
pub mod delinquency;
pub mod tax;
pub mod valuation;

pub use calendar::{add_business_days, quotation_date, roll_forward};
pub use delinquency::{delinquency, DelinquencyReport, DEFAULT_DELINQUENCY_THRESHOLD_PCT};
pub use tax::{ProvisioningTable, SettlementTaxes, TaxTables};
pub use valuation::{value_fund, Valuation, ValuationInput, SEED_SHARE_COUNT};
