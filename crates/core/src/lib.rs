pub mod money;
pub mod period;
pub mod settings;
pub mod summary;
pub mod taxonomy;
pub mod transaction;

pub use money::Money;
pub use period::{DateRange, FiscalYear};
pub use settings::{Settings, SettingsError};
pub use summary::{Aggregator, SummaryRow, SummaryTable, TotalRow, TotalTable};
pub use taxonomy::{BudgetTaxonomy, TaxonomyEntry};
pub use transaction::{BudgetPath, ClassifiedTransaction, FundType, Transaction};
