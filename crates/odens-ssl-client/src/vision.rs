use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use odens_core::{ObservationFrame, Pose2D, RobotDetection};
use odens_protos::{
    ssl_vision_detection::{SSL_DetectionFrame, SSL_DetectionRobot},
    ssl_vision_wrapper::SSL_WrapperPacket,
};

use crate::{
    mailbox::{check_open, ChannelError, Mailbox, ReceiveThread},
    transport::Transport,
};

/// How long [`VisionReceiver::get`] waits for a new frame.
pub const VISION_TIMEOUT: Duration = Duration::from_millis(1000);

/// Continuity of the frame numbers seen by one consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameGap {
    /// The frame directly follows the previous one.
    Nominal,
    /// Frames were skipped; carries the frame number difference.
    Dropped(i64),
    /// The frame is older than or equal to the previous one.
    Reordered(i64),
}

impl FrameGap {
    pub fn from_delta(delta: i64) -> Self {
        match delta {
            1 => FrameGap::Nominal,
            d if d > 1 => FrameGap::Dropped(d),
            d => FrameGap::Reordered(d),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisionFrame {
    pub frame: ObservationFrame,
    /// Current minus previous frame number as seen by this consumer. The first frame
    /// a consumer sees has delta 1.
    pub delta: i64,
}

impl VisionFrame {
    pub fn gap(&self) -> FrameGap {
        FrameGap::from_delta(self.delta)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisionPoll {
    /// No new frame arrived within [`VISION_TIMEOUT`].
    Timeout,
    Frame(VisionFrame),
}

/// Receives SSL-Vision detection frames on a background thread and keeps the most
/// recent one.
pub struct VisionChannel {
    mailbox: Arc<Mailbox<ObservationFrame>>,
    receiver: VisionReceiver,
    _thread: ReceiveThread,
}

impl VisionChannel {
    /// Join the vision multicast group and start receiving.
    pub fn start(address: &str, port: u16) -> Result<Self> {
        let transport = Transport::multicast(address, port)
            .with_context(|| format!("Failed to open vision socket {}:{}", address, port))?;
        Self::with_transport(transport)
    }

    /// Start receiving on an already opened transport.
    pub fn with_transport(transport: Transport<SSL_WrapperPacket>) -> Result<Self> {
        let mailbox = Arc::new(Mailbox::new());
        let thread = ReceiveThread::spawn(
            "vision-receiver",
            transport,
            Arc::clone(&mailbox),
            |packet| Ok(decode_packet(packet)),
        )?;
        Ok(Self {
            receiver: VisionReceiver::new(Arc::clone(&mailbox)),
            mailbox,
            _thread: thread,
        })
    }

    /// A new consumer with its own frame cursor.
    pub fn subscribe(&self) -> VisionReceiver {
        VisionReceiver::new(Arc::clone(&self.mailbox))
    }

    /// [`VisionReceiver::get`] on the channel's own consumer.
    pub fn get(&mut self) -> Result<VisionPoll, ChannelError> {
        self.receiver.get()
    }
}

/// One consumer of a [`VisionChannel`].
pub struct VisionReceiver {
    mailbox: Arc<Mailbox<ObservationFrame>>,
    sequence: u64,
    frame_number: Option<u32>,
}

impl VisionReceiver {
    fn new(mailbox: Arc<Mailbox<ObservationFrame>>) -> Self {
        Self {
            mailbox,
            sequence: 0,
            frame_number: None,
        }
    }

    /// Block until a frame newer than the last one returned to this consumer is
    /// available, or [`VISION_TIMEOUT`] elapses.
    pub fn get(&mut self) -> Result<VisionPoll, ChannelError> {
        self.get_timeout(VISION_TIMEOUT)
    }

    pub fn get_timeout(&mut self, timeout: Duration) -> Result<VisionPoll, ChannelError> {
        let seen = self.sequence;
        let guard = self.mailbox.lock();
        let (slot, _) = self.mailbox.wait_while(guard, timeout, |slot| {
            slot.sequence == seen && slot.closed.is_none()
        });
        // A frame published before the channel closed is still handed out.
        let frame = match &slot.latest {
            Some(frame) if slot.sequence != seen => frame.clone(),
            _ => {
                check_open(&slot)?;
                return Ok(VisionPoll::Timeout);
            }
        };
        self.sequence = slot.sequence;
        drop(slot);

        let delta = match self.frame_number {
            Some(previous) => i64::from(frame.frame_number) - i64::from(previous),
            None => 1,
        };
        self.frame_number = Some(frame.frame_number);
        Ok(VisionPoll::Frame(VisionFrame { frame, delta }))
    }
}

/// Convert a wrapper packet into an observation frame, skipping packets without a
/// detection frame.
pub fn decode_packet(packet: SSL_WrapperPacket) -> Option<ObservationFrame> {
    packet.detection.into_option().map(decode_detection)
}

fn decode_detection(detection: SSL_DetectionFrame) -> ObservationFrame {
    ObservationFrame {
        camera_id: detection.camera_id(),
        frame_number: detection.frame_number(),
        t_capture: detection.t_capture(),
        balls: detection
            .balls
            .iter()
            .map(|ball| Pose2D::new(ball.x() as f64, ball.y() as f64, 0.0))
            .collect(),
        robots_blue: detection.robots_blue.iter().map(decode_robot).collect(),
        robots_yellow: detection.robots_yellow.iter().map(decode_robot).collect(),
    }
}

fn decode_robot(robot: &SSL_DetectionRobot) -> RobotDetection {
    RobotDetection {
        marker: robot.robot_id,
        pose: Pose2D::new(
            robot.x() as f64,
            robot.y() as f64,
            robot.orientation.unwrap_or(0.0) as f64,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;

    use odens_protos::{ssl_vision_detection::SSL_DetectionBall, Message};

    use super::*;

    fn robot(id: Option<u32>, x: f32, y: f32, orientation: f32) -> SSL_DetectionRobot {
        let mut robot = SSL_DetectionRobot::new();
        robot.set_confidence(1.0);
        robot.robot_id = id;
        robot.set_x(x);
        robot.set_y(y);
        robot.set_orientation(orientation);
        robot.set_pixel_x(0.0);
        robot.set_pixel_y(0.0);
        robot
    }

    fn packet(frame_number: u32) -> SSL_WrapperPacket {
        let mut detection = SSL_DetectionFrame::new();
        detection.set_frame_number(frame_number);
        detection.set_t_capture(frame_number as f64 / 60.0);
        detection.set_t_sent(frame_number as f64 / 60.0);
        detection.set_camera_id(0);

        let mut ball = SSL_DetectionBall::new();
        ball.set_confidence(1.0);
        ball.set_x(120.0);
        ball.set_y(-40.0);
        ball.set_pixel_x(0.0);
        ball.set_pixel_y(0.0);
        detection.balls.push(ball);
        detection.robots_blue.push(robot(Some(1), 500.0, 250.0, 0.5));
        detection.robots_yellow.push(robot(None, -500.0, 0.0, -1.0));

        let mut packet = SSL_WrapperPacket::new();
        packet.detection = Some(detection).into();
        packet
    }

    #[test]
    fn decodes_detection() {
        let frame = decode_packet(packet(42)).unwrap();
        assert_eq!(frame.frame_number, 42);
        assert_eq!(frame.balls, vec![Pose2D::new(120.0, -40.0, 0.0)]);
        assert_eq!(frame.robots_blue[0].marker, Some(1));
        approx::assert_relative_eq!(frame.robots_blue[0].pose.theta, 0.5);
        assert_eq!(frame.robots_yellow[0].marker, None);
    }

    #[test]
    fn skips_packets_without_detection() {
        assert_eq!(decode_packet(SSL_WrapperPacket::new()), None);
    }

    fn send_and_get(
        sender: &UdpSocket,
        channel: &mut VisionChannel,
        addr: std::net::SocketAddr,
        frame_number: u32,
    ) -> VisionFrame {
        let bytes = packet(frame_number).write_to_bytes().unwrap();
        sender.send_to(&bytes, addr).unwrap();
        loop {
            match channel.get().unwrap() {
                VisionPoll::Frame(frame) if frame.frame.frame_number == frame_number => {
                    return frame
                }
                _ => continue,
            }
        }
    }

    #[test]
    fn frame_deltas_across_gets() {
        let transport = Transport::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = transport.local_addr().unwrap();
        let mut channel = VisionChannel::with_transport(transport).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        let first = send_and_get(&sender, &mut channel, addr, 10);
        assert_eq!(first.delta, 1);
        let second = send_and_get(&sender, &mut channel, addr, 11);
        assert_eq!(second.delta, 1);
        assert_eq!(second.gap(), FrameGap::Nominal);
        let third = send_and_get(&sender, &mut channel, addr, 13);
        assert_eq!(third.delta, 2);
        assert_eq!(third.gap(), FrameGap::Dropped(2));
        let fourth = send_and_get(&sender, &mut channel, addr, 12);
        assert_eq!(fourth.gap(), FrameGap::Reordered(-1));
    }

    #[test]
    fn subscribers_keep_their_own_cursor() {
        let transport = Transport::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = transport.local_addr().unwrap();
        let mut channel = VisionChannel::with_transport(transport).unwrap();
        let mut late = channel.subscribe();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        send_and_get(&sender, &mut channel, addr, 5);
        send_and_get(&sender, &mut channel, addr, 6);
        match late.get().unwrap() {
            VisionPoll::Frame(frame) => {
                assert_eq!(frame.frame.frame_number, 6);
                assert_eq!(frame.delta, 1);
            }
            VisionPoll::Timeout => panic!("expected a frame"),
        }
    }

    #[test]
    fn times_out_without_frames() {
        let transport = Transport::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let channel = VisionChannel::with_transport(transport).unwrap();
        let mut receiver = channel.subscribe();
        assert_eq!(
            receiver.get_timeout(Duration::from_millis(50)).unwrap(),
            VisionPoll::Timeout
        );
        drop(channel);
        assert!(matches!(
            receiver.get_timeout(Duration::from_millis(50)),
            Err(ChannelError::Closed { .. })
        ));
    }

    #[test]
    fn keeps_publishing_after_malformed_datagram() {
        let transport = Transport::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = transport.local_addr().unwrap();
        let mut channel = VisionChannel::with_transport(transport).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender.send_to(&[0xff, 0xff, 0xff], addr).unwrap();
        let frame = send_and_get(&sender, &mut channel, addr, 3);
        assert_eq!(frame.frame.frame_number, 3);
    }

    #[test]
    fn pending_frame_is_delivered_before_closed() {
        let mailbox = Arc::new(Mailbox::new());
        let mut receiver = VisionReceiver::new(Arc::clone(&mailbox));
        mailbox.publish(ObservationFrame {
            frame_number: 8,
            ..Default::default()
        });
        mailbox.close("vision-receiver stopped");

        match receiver.get_timeout(Duration::from_millis(50)).unwrap() {
            VisionPoll::Frame(frame) => assert_eq!(frame.frame.frame_number, 8),
            VisionPoll::Timeout => panic!("expected the pending frame"),
        }
        assert!(matches!(
            receiver.get_timeout(Duration::from_millis(50)),
            Err(ChannelError::Closed { .. })
        ));
    }

    #[test]
    fn gap_classification() {
        assert_eq!(FrameGap::from_delta(1), FrameGap::Nominal);
        assert_eq!(FrameGap::from_delta(3), FrameGap::Dropped(3));
        assert_eq!(FrameGap::from_delta(0), FrameGap::Reordered(0));
        assert_eq!(FrameGap::from_delta(-4), FrameGap::Reordered(-4));
    }
}
