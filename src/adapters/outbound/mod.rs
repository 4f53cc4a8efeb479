pub mod nginx_conf;
mod nginx_upstream_pool;
mod shell_command;
mod shell_process_controller;
mod shell_reload_controller;

pub use nginx_upstream_pool::{NginxUpstreamPool, DEFAULT_MAX_CONCURRENCY};
pub use shell_command::ShellCommandRunner;
pub use shell_process_controller::{
    render_template, ShellProcessController, DEFAULT_BACKEND_START, DEFAULT_BACKEND_STOP,
};
pub use shell_reload_controller::{
    ShellReloadController, DEFAULT_PROXY_START_COMMAND, DEFAULT_RELOAD_COMMAND,
};
