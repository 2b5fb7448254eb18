//! tracker serve command implementation

use crate::config::Config;
use crate::error::Result;
use crate::server;

/// Options for the serve command
pub struct ServeOptions {
    pub config: Config,
    pub bind: Option<String>,
}

/// Run the HTTP server in the foreground until interrupted.
pub fn run(options: ServeOptions) -> Result<()> {
    let mut config = options.config;
    if let Some(bind) = options.bind {
        config.server.bind = bind;
    }
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(&config))?;
    Ok(())
}
