//! # Drive microcontroller driver
//!
//! Talks to the motor and sensor microcontroller over a serial link. The protocol itself lives in
//! [`Engine`], this module binds it to a link and the system clock.
//!
//! The driver asks the firmware for its version as soon as it is created. If that fails the link
//! is closed and the driver stays disabled, owners should check [`Driver::is_enabled`] and carry
//! on without motor control. A read error on the link disables the driver in the same way.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod engine;
mod params;
mod parser;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use log::{error, info, trace, warn};
use serialport::SerialPort;

use comms_if::eqpt::driver::{Frame, PacketType};

pub use engine::{Engine, Pending, TransactionError};
pub use params::DriverParams;
pub use parser::Parser;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Serial port timeout. Reads and writes return straight away, reads with nothing available fail
/// with `TimedOut`.
const LINK_TIMEOUT: Duration = Duration::from_millis(0);

/// Size of a single read from the link.
const READ_CHUNK: usize = 64;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Driver on a serial port.
pub type SerialDriver = Driver<Box<dyn SerialPort>>;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Could not open the serial port {0}: {1}")]
    OpenFailed(String, serialport::Error),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Driver for the drive microcontroller.
pub struct Driver<L: Read + Write> {
    engine: Engine,

    /// `None` once the driver has been disabled
    link: Option<L>,

    stop_frame: Frame,

    /// Version request issued at start up
    version_query: Option<Pending>,
    firmware_version: Option<u8>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SerialDriver {
    /// Open the serial port named in the parameters and start the driver on it.
    pub fn open(params: &DriverParams) -> Result<Self, DriverError> {
        let port = serialport::new(params.device.as_str(), params.baud_rate)
            .timeout(LINK_TIMEOUT)
            .open()
            .map_err(|e| DriverError::OpenFailed(params.device.clone(), e))?;

        info!("Opened {} at {} baud", params.device, params.baud_rate);

        Ok(Self::new(port, params))
    }
}

impl<L: Read + Write> Driver<L> {
    /// Start the driver on an open link.
    ///
    /// The version handshake is sent immediately, its outcome is picked up by [`Driver::poll`].
    pub fn new(link: L, params: &DriverParams) -> Self {
        let mut driver = Self {
            engine: Engine::new(params),
            link: Some(link),
            stop_frame: Frame::request(PacketType::Motor, params.speed_scale.stop),
            version_query: None,
            firmware_version: None,
        };

        let now = Instant::now();
        driver.version_query = Some(driver.engine.request(PacketType::Version, 0, now));
        driver.flush(now);

        driver
    }

    /// True until the link has been closed.
    pub fn is_enabled(&self) -> bool {
        self.link.is_some()
    }

    /// Firmware version reported by the microcontroller, once the handshake has completed.
    pub fn firmware_version(&self) -> Option<u8> {
        self.firmware_version
    }

    /// Allowed range of speed offsets.
    pub fn speed_limit(&self) -> (i32, i32) {
        self.engine.speed_limit()
    }

    /// Command a motor speed as a signed offset from stop.
    ///
    /// See [`Engine::drive`].
    pub fn drive(&mut self, speed: i32) {
        self.drive_at(speed, Instant::now());
    }

    /// Ask for the distance measured by the ultrasonic sensor on `pin`.
    pub fn query_gap(&mut self, pin: u8) -> Pending {
        self.request(PacketType::UltraSonic, pin)
    }

    /// Ask for the analog reading on `pin`.
    pub fn query_analog(&mut self, pin: u8) -> Pending {
        self.request(PacketType::Analog, pin)
    }

    /// Ask for the firmware version.
    pub fn query_version(&mut self) -> Pending {
        self.request(PacketType::Version, 0)
    }

    /// Check the microcontroller is responding.
    pub fn ping(&mut self) -> Pending {
        self.request(PacketType::Ping, 0)
    }

    /// Service the link, to be called every cycle.
    pub fn poll(&mut self) {
        self.poll_at(Instant::now());
    }

    /// Service the link as of `now`.
    ///
    /// Reads whatever the link has available, advances the timers and writes anything the engine
    /// wants to send.
    pub fn poll_at(&mut self, now: Instant) {
        self.read(now);
        self.engine.poll(now);
        self.flush(now);
        self.check_version();
    }

    pub(crate) fn drive_at(&mut self, speed: i32, now: Instant) {
        if !self.is_enabled() {
            trace!("Driver disabled, ignoring drive({})", speed);
            return;
        }

        self.engine.drive(speed, now);
        self.flush(now);
    }

    fn request(&mut self, packet_type: PacketType, value: u8) -> Pending {
        if !self.is_enabled() {
            return Pending::ready(Err(TransactionError::Disabled));
        }

        let now = Instant::now();
        let pending = self.engine.request(packet_type, value, now);
        self.flush(now);
        pending
    }

    fn read(&mut self, now: Instant) {
        let mut buf = [0u8; READ_CHUNK];

        loop {
            let link = match self.link.as_mut() {
                Some(l) => l,
                None => return,
            };

            match link.read(&mut buf) {
                Ok(0) => return,
                Ok(n) => {
                    self.engine.on_bytes(&buf[..n], now);
                    if n < buf.len() {
                        return;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    error!("Read from the microcontroller link failed: {}", e);
                    self.close();
                    return;
                }
            }
        }
    }

    /// Write out everything the engine has queued for transmission.
    fn flush(&mut self, now: Instant) {
        loop {
            let bytes = self.engine.take_outbox();
            if bytes.is_empty() {
                return;
            }

            let link = match self.link.as_mut() {
                Some(l) => l,
                None => return,
            };

            match link.write_all(&bytes).and_then(|_| link.flush()) {
                Ok(()) => return,
                Err(e) => {
                    warn!("Write to the microcontroller link failed: {}", e);
                    self.engine.on_write_error(e.kind(), now);
                }
            }
        }
    }

    fn check_version(&mut self) {
        let result = match &self.version_query {
            Some(p) => p.poll(),
            None => return,
        };

        match result {
            None => (),
            Some(Ok(v)) => {
                info!("Microcontroller firmware version {}", v);
                self.firmware_version = Some(v);
                self.version_query = None;
            }
            Some(Err(e)) => {
                error!("Failed to fetch the firmware version, disabling the driver: {}", e);
                self.version_query = None;
                self.close();
            }
        }
    }

    /// Stop the motor and close the link.
    fn close(&mut self) {
        self.send_stop();
        self.link = None;
        self.engine.disable();
    }

    /// Write a stop command straight to the link, bypassing the queue.
    fn send_stop(&mut self) {
        if let Some(link) = self.link.as_mut() {
            if let Err(e) = link.write_all(&self.stop_frame.encode()).and_then(|_| link.flush()) {
                warn!("Could not send the stop command: {}", e);
            }
        }
    }
}

impl<L: Read + Write> Drop for Driver<L> {
    fn drop(&mut self) {
        if self.is_enabled() {
            info!("Stopping the motor");
            self.close();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::adjust::{Actuator, AdjustParams, Adjuster, Position, Role, Side};
    use comms_if::eqpt::driver::SpeedScale;
    use std::{cell::RefCell, collections::VecDeque, rc::Rc};

    #[derive(Default)]
    struct LinkState {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        broken: bool,

        /// Report an empty receive buffer the way a serial port with a zero timeout does
        times_out: bool,
    }

    /// In memory link, clones share the same buffers.
    #[derive(Clone, Default)]
    struct MockLink(Rc<RefCell<LinkState>>);

    impl MockLink {
        fn respond(&self, packet_type: PacketType, value: u8) {
            self.0
                .borrow_mut()
                .rx
                .extend(Frame::request(packet_type, value).encode().iter());
        }

        fn sent(&self) -> Vec<Frame> {
            let tx = std::mem::take(&mut self.0.borrow_mut().tx);
            Parser::new().push(&tx)
        }

        fn break_link(&self) {
            self.0.borrow_mut().broken = true;
        }
    }

    impl Read for MockLink {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let mut state = self.0.borrow_mut();
            if state.broken {
                return Err(std::io::Error::new(ErrorKind::Other, "device unplugged"));
            }
            if state.rx.is_empty() {
                return match state.times_out {
                    true => Err(ErrorKind::TimedOut.into()),
                    false => Err(ErrorKind::WouldBlock.into()),
                };
            }

            let n = buf.len().min(state.rx.len());
            for (dst, src) in buf.iter_mut().zip(state.rx.drain(..n)) {
                *dst = src;
            }
            Ok(n)
        }
    }

    impl Write for MockLink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn params() -> DriverParams {
        DriverParams {
            device: String::from("/dev/null"),
            baud_rate: 1_000_000,
            timeout_ms: 100,
            max_retries: 10,
            queue_capacity: 16,
            feed_interval_ms: 100,
            speed_scale: SpeedScale {
                back_full: 0x00,
                stop: 0x10,
                forward_full: 0xa0,
            },
            limit_factor: 1.0,
        }
    }

    fn stop() -> Frame {
        Frame::request(PacketType::Motor, 0x10)
    }

    /// Start a driver and complete its version handshake.
    fn started(link: &MockLink) -> Driver<MockLink> {
        let mut d = Driver::new(link.clone(), &params());
        assert_eq!(link.sent(), vec![Frame::request(PacketType::Version, 0)]);
        link.respond(PacketType::Version, 4);
        d.poll();
        d
    }

    #[test]
    fn test_version_handshake() {
        let link = MockLink::default();
        let d = started(&link);

        assert!(d.is_enabled());
        assert_eq!(d.firmware_version(), Some(4));
    }

    #[test]
    fn test_version_timeout_disables() {
        let link = MockLink::default();
        let mut d = Driver::new(link.clone(), &params());
        let t0 = Instant::now();

        let mut sends = link.sent().len();
        for i in 1..=10 {
            d.poll_at(t0 + Duration::from_millis(100 * i));
            sends += link.sent().iter().filter(|f| f.packet_type() == Some(PacketType::Version)).count();
        }

        assert_eq!(sends, 10);
        assert!(!d.is_enabled());
        assert_eq!(d.firmware_version(), None);

        // Later requests fail straight away
        assert_eq!(d.query_gap(7).poll(), Some(Err(TransactionError::Disabled)));
    }

    #[test]
    fn test_gap_query() {
        let link = MockLink::default();
        let mut d = started(&link);

        let p = d.query_gap(7);
        assert_eq!(link.sent(), vec![Frame::request(PacketType::UltraSonic, 7)]);
        assert_eq!(p.poll(), None);

        link.respond(PacketType::UltraSonic, 30);
        d.poll();
        assert_eq!(p.poll(), Some(Ok(30)));
    }

    #[test]
    fn test_idle_link_does_not_block() {
        assert_eq!(LINK_TIMEOUT, Duration::from_millis(0));

        let link = MockLink::default();
        let mut d = started(&link);
        link.0.borrow_mut().times_out = true;

        let p = d.query_gap(7);
        link.sent();

        // Nothing to read is not an error
        let t0 = Instant::now();
        for i in 0..5 {
            d.poll_at(t0 + Duration::from_millis(10 * i));
        }
        assert!(d.is_enabled());
        assert_eq!(p.poll(), None);

        link.respond(PacketType::UltraSonic, 25);
        d.poll_at(t0 + Duration::from_millis(50));
        assert_eq!(p.poll(), Some(Ok(25)));
    }

    #[test]
    fn test_read_error_disables() {
        let link = MockLink::default();
        let mut d = started(&link);

        let p = d.query_analog(1);
        link.sent();
        link.break_link();
        d.poll();

        assert!(!d.is_enabled());
        assert_eq!(p.poll(), Some(Err(TransactionError::Disabled)));
        assert_eq!(link.sent(), vec![stop()]);
    }

    #[test]
    fn test_stop_on_drop() {
        let link = MockLink::default();
        let mut d = started(&link);

        d.drive(0x20);
        assert_eq!(link.sent(), vec![Frame::request(PacketType::Motor, 0x30)]);

        drop(d);
        assert_eq!(link.sent(), vec![stop()]);
    }

    #[test]
    fn test_drive_stop_sends_stop() {
        let link = MockLink::default();
        let mut d = started(&link);

        d.drive(0x20);
        link.respond(PacketType::Motor, 0x30);
        d.poll();
        link.sent();

        d.drive(0);
        assert_eq!(link.sent(), vec![stop()]);
    }

    struct DriverActuator<'a> {
        driver: &'a mut Driver<MockLink>,
        drives: usize,
    }

    impl<'a> Actuator for DriverActuator<'a> {
        fn drive(&mut self, speed: i32) {
            self.drives += 1;
            self.driver.drive(speed);
        }

        fn steering(&mut self, _degree: i32) {}
    }

    #[test]
    fn test_repeated_speed_is_not_resent() {
        let link = MockLink::default();
        let mut d = started(&link);

        let mut adj = Adjuster::new(
            AdjustParams {
                car_length_mm: 264.0,
                car_width_mm: 195.0,
                steer_limit_deg: 27,
                gap_gain_deg: 0.0,
                gap_side: Side::Right,
                cam_dead_band: 3,
                cam_speed_step: 2,
            },
            Position {
                own_index: 0,
                line_length: 1,
            },
            Role::Follower,
            d.speed_limit(),
            0,
        );

        let mut act = DriverActuator {
            driver: &mut d,
            drives: 0,
        };

        adj.speed_update(0x50, &mut act);
        assert_eq!(link.sent(), vec![Frame::request(PacketType::Motor, 0x60)]);

        link.respond(PacketType::Motor, 0x60);
        act.driver.poll();

        adj.speed_update(0x50, &mut act);
        assert_eq!(act.drives, 1);
        assert!(link.sent().is_empty());
    }
}
