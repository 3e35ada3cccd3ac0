pub mod pending;
pub mod position;
pub mod trade;
pub mod transaction;
