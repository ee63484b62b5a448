use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use odens_core::{OdensSettings, Pose2D};
use odens_ssl_client::{RefereeChannel, RefereePoll};
use odens_world::GameModeDecider;

use super::run_until_ctrl_c;

/// Run the play mode decider on live referee input, without vision.
pub async fn test_game(settings: OdensSettings) -> Result<()> {
    run_until_ctrl_c(move |stop| {
        let mut referee =
            RefereeChannel::start(&settings.referee.address, settings.referee.port)?;
        let mut decider = GameModeDecider::new(settings.my_color, settings.game);
        let epoch = Instant::now();

        while !stop.is_set() {
            match referee.get()? {
                RefereePoll::NotYetReceived => println!("Not yet received"),
                RefereePoll::Stale(_) => {}
                RefereePoll::Fresh(snapshot) => {
                    let now = epoch.elapsed().as_secs_f64();
                    let mode = decider.decide(snapshot.command, &Pose2D::invisible(), now);
                    println!("{} -> {}", snapshot.command, mode);
                }
            }
            thread::sleep(Duration::from_millis(100));
        }
        Ok(())
    })
    .await
}
