//! Concrete adapters behind the port traits.

pub mod abicom;
pub mod anfavea;
pub mod bcb;
pub mod csv_log_store;
pub mod fgv;
pub mod file_config_adapter;
pub mod html;
pub mod http;
pub mod ibge;
pub mod publisher;
pub mod render;
pub mod ssp;
