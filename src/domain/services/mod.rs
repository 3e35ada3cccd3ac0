pub mod position_ledger;
pub mod transaction_processor;
