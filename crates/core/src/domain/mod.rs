pub mod appointment;
pub mod caller;
pub mod catalog;
pub mod quote;
