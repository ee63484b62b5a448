use std::path::PathBuf;

use anyhow::Result;
use odens_core::OdensSettings;

use super::run_until_ctrl_c;
use crate::controller::Controller;

/// The full control loop.
pub async fn run(settings: OdensSettings, log_directory: PathBuf) -> Result<()> {
    run_until_ctrl_c(move |stop| {
        let mut controller = Controller::start(settings, &log_directory)?;
        if let Some(path) = controller.match_log_path() {
            tracing::info!("Match log: {}", path.display());
        }
        tracing::info!(
            "Main loop started as {} {}",
            controller.settings().my_color,
            controller.settings().my_number
        );
        while !stop.is_set() {
            controller.tick();
        }
        Ok(())
    })
    .await
}
