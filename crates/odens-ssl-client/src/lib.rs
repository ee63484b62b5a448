//! Network ingest for the SSL-Vision and referee box multicast feeds.
//!
//! Each channel owns a UDP socket and a background receive thread that decodes
//! packets and keeps only the latest value. Consumers read through their own cursor,
//! so several parts of the controller can follow the same feed.

mod mailbox;
mod referee;
mod transport;
mod vision;

pub use mailbox::ChannelError;
pub use referee::{decode_referee, RefereeChannel, RefereePoll, RefereeReceiver};
pub use transport::{Received, Transport, READ_TIMEOUT};
pub use vision::{
    decode_packet, FrameGap, VisionChannel, VisionFrame, VisionPoll, VisionReceiver,
    VISION_TIMEOUT,
};
