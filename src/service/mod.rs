pub mod cars;
pub mod expiry;
pub mod policies;
