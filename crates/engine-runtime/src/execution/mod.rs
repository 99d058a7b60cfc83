pub mod executor;
pub mod inspect;
