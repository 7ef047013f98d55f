pub mod constants;
pub mod store;
