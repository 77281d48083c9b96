pub mod router;
pub mod service;
