pub mod quote_slate;
pub mod request;
pub mod user;
