pub mod aggregate;
pub mod compartment;
pub mod config;
pub mod event_broker;
pub mod event_store;
pub mod read_model_updater;
pub mod repository;
pub mod trailer;
