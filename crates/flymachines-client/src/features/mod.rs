pub mod lease;
pub mod machines;
pub mod transport;
pub mod wait;
