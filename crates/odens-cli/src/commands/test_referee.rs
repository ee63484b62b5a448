use std::{thread, time::Duration};

use anyhow::Result;
use odens_core::{OdensSettings, TeamColor};
use odens_ssl_client::{RefereeChannel, RefereePoll};

use super::run_until_ctrl_c;

pub async fn test_referee(settings: OdensSettings) -> Result<()> {
    run_until_ctrl_c(move |stop| {
        let mut referee =
            RefereeChannel::start(&settings.referee.address, settings.referee.port)?;
        println!(
            "Listening for the referee on {}:{}",
            settings.referee.address, settings.referee.port
        );

        while !stop.is_set() {
            match referee.get()? {
                RefereePoll::NotYetReceived => println!("Not yet received"),
                RefereePoll::Stale(_) => println!("No new packet"),
                RefereePoll::Fresh(snapshot) => println!(
                    "{} {} (#{}), {} s left, blue {} : {} yellow",
                    snapshot.stage,
                    snapshot.command,
                    snapshot.command_counter,
                    snapshot.stage_time_left / 1_000_000,
                    snapshot.score(TeamColor::Blue),
                    snapshot.score(TeamColor::Yellow),
                ),
            }
            thread::sleep(Duration::from_secs(1));
        }
        Ok(())
    })
    .await
}
