pub mod bootstrap;
pub mod config;
pub mod http_client;
pub mod services;
pub mod supervisor_client;
