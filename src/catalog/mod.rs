pub mod audit;
pub mod config;
pub mod file_store;
pub mod inventory;
pub mod paths;
pub mod pipeline;
pub mod reconcile;
pub mod record;
pub mod status;
pub mod status_info;
pub mod store;
pub mod tape_info;
pub mod util;
pub mod warn;
