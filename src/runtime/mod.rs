pub mod engine;
pub mod redis_engine;
pub mod storage;
pub mod redis_storage;
pub mod notify;
pub mod coordinator;
