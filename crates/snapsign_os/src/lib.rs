#![forbid(unsafe_code)]

pub mod export;
pub mod session;
pub mod share_link;
