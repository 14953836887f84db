pub mod notice;
pub mod requests;
pub mod responses;
pub mod session;
pub mod snapshot;
