pub mod service;

pub use service::LeaseService;
