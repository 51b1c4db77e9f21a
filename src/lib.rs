pub mod error;
pub mod types;

pub mod domain;
pub mod reactive;
pub mod remote;
pub mod storage;
pub mod sync;
