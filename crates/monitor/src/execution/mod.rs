pub mod aave_client;
pub mod contracts;
