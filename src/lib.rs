pub mod banner;
pub mod config;
pub mod connectors;
pub mod consts;
pub mod events;
pub mod gateway;
pub mod journal;
pub mod registry;
