pub mod slot;
pub mod stats;
pub mod validator;
