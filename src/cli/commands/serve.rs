use anyhow::Result;
use tracing::info;

use crate::cli::config::Config;
use crate::cli::ServeArgs;
use crate::native;

pub async fn execute_serve(args: ServeArgs) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;

    native::init_tracing(config.json_logs);
    info!(
        listen = %config.listen,
        max_value_depth = config.max_value_depth,
        send_timeout_secs = config.send_timeout_secs,
        "starting receiver"
    );

    native::serve(&config).await
}
