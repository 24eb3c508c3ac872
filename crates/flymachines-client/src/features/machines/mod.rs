pub mod service;

pub use service::MachineService;
