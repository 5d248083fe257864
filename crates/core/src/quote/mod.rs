pub mod dto;
pub mod record;
pub mod service;
pub mod store;
