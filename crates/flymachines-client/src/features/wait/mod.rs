pub mod service;

pub use service::WaitService;
