pub mod beacon;
pub mod error;
