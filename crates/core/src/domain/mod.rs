pub mod address;
pub mod events;
pub mod premium;
pub mod vehicle;
