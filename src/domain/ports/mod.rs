mod process_controller;
mod reload_controller;
mod upstream_pool;

pub use process_controller::{CommandError, ProcessController};
pub use reload_controller::ReloadController;
pub use upstream_pool::{PoolError, UpstreamPool};
