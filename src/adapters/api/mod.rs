pub mod client;
pub mod dto;
pub mod retry;
pub mod task_cache;


pub use client::BoardClient;
