pub mod category;
pub mod money;
pub mod sink;
pub mod transaction;

pub use category::{Category, ALL_CATEGORIES};
pub use money::{Money, ParseMoneyError};
pub use sink::RecordSink;
pub use transaction::{Direction, LedgerError, NormalizedTransaction, RawTransaction, Source};
