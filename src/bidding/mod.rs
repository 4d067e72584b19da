pub mod commands;
pub mod ledger;
