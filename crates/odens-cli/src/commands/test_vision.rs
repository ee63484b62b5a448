use anyhow::Result;
use odens_core::{robot_slots, OdensSettings, TeamColor};
use odens_ssl_client::{FrameGap, VisionChannel, VisionPoll};
use odens_world::{Estimator, VisionMapper};

use super::run_until_ctrl_c;

/// Print every vision frame as seen by the mapper and the estimator.
pub async fn test_vision(settings: OdensSettings) -> Result<()> {
    run_until_ctrl_c(move |stop| {
        let mut vision = VisionChannel::start(&settings.vision.address, settings.vision.port)?;
        let mapper = VisionMapper::from_settings(&settings);
        let mut estimator = Estimator::new(settings.estimator);
        let epoch = std::time::Instant::now();
        println!(
            "Listening for vision on {}:{}",
            settings.vision.address, settings.vision.port
        );

        while !stop.is_set() {
            let frame = match vision.get()? {
                VisionPoll::Timeout => {
                    println!("Vision timeout");
                    continue;
                }
                VisionPoll::Frame(frame) => frame,
            };
            match frame.gap() {
                FrameGap::Nominal => {}
                FrameGap::Dropped(delta) => println!("Frame number advanced by {}", delta),
                FrameGap::Reordered(delta) => println!("Frame out of order ({})", delta),
            }

            let mapped = mapper.map(&frame.frame);
            let now = epoch.elapsed().as_secs_f64();
            let (estimate, velocity) = estimator.update_with_velocity(&mapped.field, now);

            println!(
                "frame {} camera {}: ball {} (estimate {}, speed {:.0})",
                frame.frame.frame_number,
                frame.frame.camera_id,
                mapped.field.ball,
                estimate.ball,
                velocity.speed()
            );
            for color in TeamColor::ALL {
                for slot in robot_slots() {
                    if estimate.robot(color, slot).is_visible() {
                        println!("  {} {}: {}", color, slot, estimate.robot(color, slot));
                    }
                }
            }
        }
        Ok(())
    })
    .await
}
