//! Command implementations for dane-smtp

pub mod connect;
pub mod resolve;
pub mod tlsa;
pub mod verify;

pub use connect::run_connect;
pub use resolve::run_resolve;
pub use tlsa::run_tlsa;
pub use verify::run_verify;
