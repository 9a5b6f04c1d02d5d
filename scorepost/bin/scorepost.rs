#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::{path::PathBuf, time::Duration};

use scorepost::{Scorepost, controller::CONFIG_SEARCH_PATH};

fn main() -> anyhow::Result<()> {
    let config_path = Scorepost::locate(
        std::env::var_os("SCOREPOST_CONFIG").map(PathBuf::from),
        &CONFIG_SEARCH_PATH,
    )?;
    let scorepost = Scorepost::load(&config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(scorepost.run(config_path));

    // A pending stdin read holds a blocking thread until the next line arrives
    runtime.shutdown_timeout(Duration::from_secs(1));

    result
}
