pub mod errors;
pub mod execution;
pub mod observer;
pub mod stats;
pub mod sync;
pub mod types;
pub mod validator;
pub mod waiting_area;
