pub mod cancel;
pub mod connection;
pub mod constants;
pub mod rpc;
