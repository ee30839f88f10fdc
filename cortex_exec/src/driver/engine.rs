//! # Protocol engine
//!
//! Transport independent core of the microcontroller driver. The engine owns the request queue,
//! the receive parser, the response timeout and the motor watchdog feed, and is driven entirely
//! by the caller:
//!
//! - requests are added with [`Engine::request`] and [`Engine::drive`],
//! - received bytes are handed over with [`Engine::on_bytes`],
//! - timers are advanced with [`Engine::poll`],
//! - bytes to transmit are collected with [`Engine::take_outbox`].
//!
//! Every entry point takes the current instant so the engine can be exercised without a clock or
//! a serial port.
//!
//! Only the head of the queue is ever on the wire. It stays there until a response matching its
//! type arrives, or until it has timed out on every retry. Responses which do not match the head
//! mean the microcontroller skipped requests, those requests are completed with
//! [`TransactionError::Desync`] and discarded until a match is found.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use comms_if::eqpt::driver::{Frame, PacketType, SpeedScale};
use util::{maths::clamp, timer::Timer};

use super::{parser::Parser, DriverParams};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons a request can complete without a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("No response from the microcontroller after {0} attempts")]
    Timeout(u8),

    #[error("The microcontroller rejected the request")]
    Rejected,

    #[error("Discarded while resynchronising with the microcontroller")]
    Desync,

    #[error("The request queue is full")]
    QueueFull,

    #[error("Could not write the request to the link: {0:?}")]
    Write(std::io::ErrorKind),

    #[error("The link to the microcontroller is closed")]
    Disabled,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle on the result of a request.
///
/// The result is delivered exactly once, after which the handle reports it once and is empty.
#[derive(Debug)]
pub struct Pending {
    rx: Receiver<Result<u8, TransactionError>>,
}

/// A queued request and the channel its completion is delivered on.
///
/// Fire and forget requests, such as motor feeds, carry no channel.
#[derive(Debug)]
struct Transaction {
    frame: Frame,
    reply: Option<Sender<Result<u8, TransactionError>>>,
}

/// Request queue, retry and watchdog state machine.
#[derive(Debug)]
pub struct Engine {
    parser: Parser,
    queue: VecDeque<Transaction>,
    queue_capacity: usize,

    /// True while the head of the queue is on the wire waiting for its response
    in_flight: bool,

    /// Response timeout for the head of the queue
    timeout: Timer,
    retries: u8,
    max_retries: u8,

    /// Periodic motor command resend, keeps the firmware watchdog from stopping the motor
    feeder: Timer,

    speed_scale: SpeedScale,
    speed_limit: (i32, i32),
    speed: u8,

    outbox: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pending {
    /// A handle which is already complete.
    pub(crate) fn ready(result: Result<u8, TransactionError>) -> Self {
        let (tx, rx) = mpsc::channel();
        tx.send(result).ok();
        Self { rx }
    }

    /// Get the result if the request has completed.
    ///
    /// Returns `None` while the request is outstanding. If the engine holding the request is
    /// dropped before completing it the request reports [`TransactionError::Disabled`].
    pub fn poll(&self) -> Option<Result<u8, TransactionError>> {
        match self.rx.try_recv() {
            Ok(r) => Some(r),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TransactionError::Disabled)),
        }
    }
}

impl Transaction {
    fn complete(self, result: Result<u8, TransactionError>) {
        if let Some(tx) = self.reply {
            // The requester may have dropped its handle, which is fine
            tx.send(result).ok();
        }
    }

    fn packet_name(&self) -> String {
        match self.frame.packet_type() {
            Some(t) => format!("{:?}", t),
            None => format!("0x{:02X}", self.frame.raw_type),
        }
    }
}

impl Engine {
    /// Create a new engine with an empty queue and the motor stopped.
    pub fn new(params: &DriverParams) -> Self {
        let scale = params.speed_scale;

        Self {
            parser: Parser::new(),
            queue: VecDeque::with_capacity(params.queue_capacity + 1),
            queue_capacity: params.queue_capacity,
            in_flight: false,
            timeout: Timer::new(Duration::from_millis(params.timeout_ms)),
            retries: 0,
            max_retries: params.max_retries,
            feeder: Timer::new(Duration::from_millis(params.feed_interval_ms)),
            speed_scale: scale,
            speed_limit: params.speed_limit(),
            speed: scale.stop,
            outbox: Vec::new(),
        }
    }

    /// Queue a request and get a handle on its result.
    pub fn request(&mut self, packet_type: PacketType, value: u8, now: Instant) -> Pending {
        let (tx, rx) = mpsc::channel();
        self.send(Frame::request(packet_type, value), Some(tx), now);
        Pending { rx }
    }

    /// Command a motor speed, as a signed offset from the stop value.
    ///
    /// The offset is limited to the allowed range first. A non-zero speed is sent immediately
    /// and then resent at the feed interval, a zero speed cancels the feed and sends the stop
    /// command.
    pub fn drive(&mut self, speed: i32, now: Instant) {
        let offset = clamp(&speed, &self.speed_limit.0, &self.speed_limit.1);
        if offset != speed {
            debug!("Motor speed {} limited to {}", speed, offset);
        }

        self.speed = (self.speed_scale.stop as i32 + offset) as u8;

        if self.speed == self.speed_scale.stop {
            self.feeder.stop();
        } else {
            self.feeder.start_after(now);
        }

        self.send(Frame::request(PacketType::Motor, self.speed), None, now);
    }

    /// Speed byte currently commanded.
    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Allowed range of speed offsets.
    pub fn speed_limit(&self) -> (i32, i32) {
        self.speed_limit
    }

    /// True while the motor command is being resent periodically.
    pub fn is_feeding(&self) -> bool {
        self.feeder.is_running()
    }

    /// Number of requests waiting or in flight.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Feed bytes received from the link.
    pub fn on_bytes(&mut self, bytes: &[u8], now: Instant) {
        for frame in self.parser.push(bytes) {
            self.on_frame(frame, now);
        }
    }

    /// Advance the timers to `now`.
    pub fn poll(&mut self, now: Instant) {
        if self.timeout.poll(now) {
            self.timeout.stop();
            self.on_timeout(now);
        }

        if self.feeder.poll(now) {
            trace!("Motor feed");
            self.send(Frame::request(PacketType::Motor, self.speed), None, now);
        }
    }

    /// Take the bytes which must be written to the link.
    pub fn take_outbox(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbox)
    }

    /// Report that writing the head of the queue failed.
    ///
    /// The head is completed with the error and the next request, if any, is transmitted.
    pub fn on_write_error(&mut self, kind: std::io::ErrorKind, now: Instant) {
        self.timeout.stop();
        self.retries = 0;
        self.in_flight = false;
        self.outbox.clear();

        if let Some(t) = self.queue.pop_front() {
            warn!("Failed to write {} request: {:?}", t.packet_name(), kind);
            t.complete(Err(TransactionError::Write(kind)));
        }

        self.transmit_head(now);
    }

    /// Complete every outstanding request with [`TransactionError::Disabled`] and stop all
    /// timers.
    pub fn disable(&mut self) {
        self.timeout.stop();
        self.feeder.stop();
        self.in_flight = false;
        self.outbox.clear();

        for t in self.queue.drain(..) {
            t.complete(Err(TransactionError::Disabled));
        }
    }

    fn send(&mut self, frame: Frame, reply: Option<Sender<Result<u8, TransactionError>>>, now: Instant) {
        let transaction = Transaction { frame, reply };

        // A stop command is never dropped so the motor can always be halted
        let is_stop = frame.packet_type() == Some(PacketType::Motor) && frame.value == self.speed_scale.stop;

        if self.queue.len() >= self.queue_capacity && !is_stop {
            warn!(
                "Request queue full ({}), dropping {} request with value {}",
                self.queue.len(),
                transaction.packet_name(),
                frame.value
            );
            transaction.complete(Err(TransactionError::QueueFull));
            return;
        }

        self.queue.push_back(transaction);
        trace!("Queued request, queue length {}", self.queue.len());

        if !self.in_flight {
            self.transmit_head(now);
        }
    }

    /// Put the head of the queue on the wire and start its response timeout.
    fn transmit_head(&mut self, now: Instant) {
        match self.queue.front() {
            Some(head) => {
                trace!("TX {:02X} {:3}", head.frame.raw_type, head.frame.value);
                self.outbox.extend_from_slice(&head.frame.encode());
                self.in_flight = true;
                self.timeout.start_after(now);
            }
            None => {
                self.in_flight = false;
                self.timeout.stop();
            }
        }
    }

    fn on_timeout(&mut self, now: Instant) {
        self.retries += 1;

        if self.retries < self.max_retries {
            debug!("Response timeout, retry {}", self.retries);
            self.transmit_head(now);
            return;
        }

        let attempts = self.retries;
        self.retries = 0;

        if let Some(t) = self.queue.pop_front() {
            warn!("Response timeout, giving up on {} request after {} attempts", t.packet_name(), attempts);
            t.complete(Err(TransactionError::Timeout(attempts)));
        }

        self.in_flight = false;
        self.transmit_head(now);
    }

    fn on_frame(&mut self, frame: Frame, now: Instant) {
        trace!("RX {:02X} {:3}", frame.raw_type, frame.value);

        // Any well formed frame shows the link is alive
        self.timeout.stop();
        self.retries = 0;

        let packet_type = match frame.packet_type() {
            Some(t) => t,
            None => {
                trace!("Discarding unknown response type 0x{:02X}", frame.type_byte());

                // Keep waiting for the head's own response
                if self.in_flight {
                    self.timeout.start_after(now);
                }
                return;
            }
        };

        let mut matched = false;
        while let Some(t) = self.queue.pop_front() {
            if t.frame.raw_type == packet_type as u8 {
                let result = if frame.is_error() {
                    warn!("{:?} request rejected by the microcontroller", packet_type);
                    Err(TransactionError::Rejected)
                } else {
                    Ok(frame.value)
                };
                t.complete(result);
                matched = true;
                break;
            }

            warn!("tx/rx desync: expected {}, got {:?}", t.packet_name(), packet_type);
            t.complete(Err(TransactionError::Desync));
        }

        if !matched {
            warn!("Response {:?} matched no outstanding request", packet_type);
        }

        self.in_flight = false;
        self.transmit_head(now);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::driver::ERR_BIT;

    fn params() -> DriverParams {
        DriverParams {
            device: String::from("/dev/null"),
            baud_rate: 1_000_000,
            timeout_ms: 100,
            max_retries: 10,
            queue_capacity: 16,
            feed_interval_ms: 100,
            speed_scale: SpeedScale {
                back_full: 0x10,
                stop: 0x30,
                forward_full: 0x90,
            },
            limit_factor: 1.0,
        }
    }

    fn response(packet_type: PacketType, value: u8) -> Vec<u8> {
        Frame::request(packet_type, value).encode().to_vec()
    }

    fn frames(bytes: &[u8]) -> Vec<Frame> {
        Parser::new().push(bytes)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_request_response() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        let p = e.request(PacketType::Version, 0, t0);
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Version, 0)]);
        assert_eq!(p.poll(), None);

        e.on_bytes(&response(PacketType::Version, 3), t0 + ms(5));
        assert_eq!(p.poll(), Some(Ok(3)));
        assert_eq!(p.poll(), None);
        assert_eq!(e.queue_len(), 0);
    }

    #[test]
    fn test_only_head_in_flight() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        let p1 = e.request(PacketType::UltraSonic, 7, t0);
        let p2 = e.request(PacketType::Analog, 2, t0);

        // Only the first request goes out
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::UltraSonic, 7)]);

        e.on_bytes(&response(PacketType::UltraSonic, 30), t0 + ms(10));
        assert_eq!(p1.poll(), Some(Ok(30)));

        // The response releases the second one
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Analog, 2)]);
        e.on_bytes(&response(PacketType::Analog, 200), t0 + ms(20));
        assert_eq!(p2.poll(), Some(Ok(200)));
        assert!(e.take_outbox().is_empty());
    }

    #[test]
    fn test_error_response() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        let p = e.request(PacketType::Analog, 9, t0);
        e.on_bytes(&[b'[', PacketType::Analog as u8 | ERR_BIT, 0, b']'], t0);

        assert_eq!(p.poll(), Some(Err(TransactionError::Rejected)));
    }

    #[test]
    fn test_desync_skips_to_match() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        let p1 = e.request(PacketType::Ping, 0, t0);
        let p2 = e.request(PacketType::Version, 0, t0);
        let p3 = e.request(PacketType::UltraSonic, 7, t0);
        let p4 = e.request(PacketType::Analog, 1, t0);
        e.take_outbox();

        // The first two were lost, the third is answered
        e.on_bytes(&response(PacketType::UltraSonic, 42), t0);

        assert_eq!(p1.poll(), Some(Err(TransactionError::Desync)));
        assert_eq!(p2.poll(), Some(Err(TransactionError::Desync)));
        assert_eq!(p3.poll(), Some(Ok(42)));
        assert_eq!(p4.poll(), None);
        assert_eq!(e.queue_len(), 1);
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Analog, 1)]);
    }

    #[test]
    fn test_unmatched_response_drains_queue() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        let p1 = e.request(PacketType::Ping, 0, t0);
        let p2 = e.request(PacketType::Analog, 0, t0);

        e.on_bytes(&response(PacketType::Version, 1), t0);

        assert_eq!(p1.poll(), Some(Err(TransactionError::Desync)));
        assert_eq!(p2.poll(), Some(Err(TransactionError::Desync)));
        assert_eq!(e.queue_len(), 0);
    }

    #[test]
    fn test_timeout_retries_then_fails() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        let p = e.request(PacketType::Ping, 0, t0);
        let mut sends = frames(&e.take_outbox()).len();

        let mut now = t0;
        for _ in 0..9 {
            now += ms(100);
            e.poll(now);
            sends += frames(&e.take_outbox()).len();
            assert_eq!(p.poll(), None);
        }

        // Tenth timeout fails the request without another send
        now += ms(100);
        e.poll(now);
        sends += frames(&e.take_outbox()).len();

        assert_eq!(sends, 10);
        assert_eq!(p.poll(), Some(Err(TransactionError::Timeout(10))));
        assert_eq!(e.queue_len(), 0);
    }

    #[test]
    fn test_timeout_moves_to_next() {
        let t0 = Instant::now();
        let mut e = Engine::new(&DriverParams {
            max_retries: 2,
            ..params()
        });

        let p1 = e.request(PacketType::Ping, 0, t0);
        let p2 = e.request(PacketType::Version, 0, t0);
        e.take_outbox();

        e.poll(t0 + ms(100));
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Ping, 0)]);

        e.poll(t0 + ms(200));
        assert_eq!(p1.poll(), Some(Err(TransactionError::Timeout(2))));
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Version, 0)]);

        e.on_bytes(&response(PacketType::Version, 5), t0 + ms(210));
        assert_eq!(p2.poll(), Some(Ok(5)));
    }

    #[test]
    fn test_response_resets_retries() {
        let t0 = Instant::now();
        let mut e = Engine::new(&DriverParams {
            max_retries: 2,
            ..params()
        });

        let p1 = e.request(PacketType::Ping, 0, t0);
        e.poll(t0 + ms(100));
        e.on_bytes(&response(PacketType::Ping, 0), t0 + ms(150));
        assert_eq!(p1.poll(), Some(Ok(0)));

        // The second request gets its full retry budget
        let p2 = e.request(PacketType::Ping, 0, t0 + ms(150));
        e.poll(t0 + ms(250));
        assert_eq!(p2.poll(), None);
        e.poll(t0 + ms(350));
        assert_eq!(p2.poll(), Some(Err(TransactionError::Timeout(2))));
    }

    #[test]
    fn test_unknown_type_keeps_head() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        let p = e.request(PacketType::Analog, 3, t0);
        e.take_outbox();

        // Neither a plain nor an error flagged unknown type touches the queue
        e.on_bytes(&[b'[', 0x05, 0x11, b']'], t0 + ms(10));
        e.on_bytes(&[b'[', 0x05 | ERR_BIT, 0x11, b']'], t0 + ms(20));

        assert_eq!(p.poll(), None);
        assert_eq!(e.queue_len(), 1);
        assert!(e.take_outbox().is_empty());

        e.on_bytes(&response(PacketType::Analog, 9), t0 + ms(30));
        assert_eq!(p.poll(), Some(Ok(9)));
        assert_eq!(e.queue_len(), 0);
    }

    #[test]
    fn test_any_frame_resets_timeout() {
        let t0 = Instant::now();
        let mut e = Engine::new(&DriverParams {
            max_retries: 2,
            ..params()
        });

        let p = e.request(PacketType::Ping, 0, t0);
        e.take_outbox();

        // First timeout uses one retry
        e.poll(t0 + ms(100));
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Ping, 0)]);

        // An unknown frame restarts the timeout from its arrival and clears the retries
        e.on_bytes(&[b'[', 0x05, 0, b']'], t0 + ms(150));
        e.poll(t0 + ms(200));
        assert!(e.take_outbox().is_empty());
        assert_eq!(p.poll(), None);

        e.poll(t0 + ms(250));
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Ping, 0)]);
        assert_eq!(p.poll(), None);

        e.poll(t0 + ms(350));
        assert_eq!(p.poll(), Some(Err(TransactionError::Timeout(2))));
    }

    #[test]
    fn test_non_matching_frame_resets_timeout() {
        let t0 = Instant::now();
        let mut e = Engine::new(&DriverParams {
            max_retries: 2,
            ..params()
        });

        let p1 = e.request(PacketType::Ping, 0, t0);
        let p2 = e.request(PacketType::Version, 0, t0);
        let p3 = e.request(PacketType::Analog, 4, t0);
        e.take_outbox();

        e.poll(t0 + ms(100));
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Ping, 0)]);

        // Answer for the second request skips the first and releases the third
        e.on_bytes(&response(PacketType::Version, 2), t0 + ms(150));
        assert_eq!(p1.poll(), Some(Err(TransactionError::Desync)));
        assert_eq!(p2.poll(), Some(Ok(2)));
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Analog, 4)]);

        // The third request starts with its full retry budget
        e.poll(t0 + ms(250));
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Analog, 4)]);
        assert_eq!(p3.poll(), None);

        e.poll(t0 + ms(350));
        assert_eq!(p3.poll(), Some(Err(TransactionError::Timeout(2))));
    }

    #[test]
    fn test_queue_full_drops_except_stop() {
        let t0 = Instant::now();
        let mut e = Engine::new(&DriverParams {
            queue_capacity: 2,
            ..params()
        });

        let p1 = e.request(PacketType::Ping, 0, t0);
        let p2 = e.request(PacketType::Ping, 0, t0);
        let p3 = e.request(PacketType::Ping, 0, t0);

        assert_eq!(p1.poll(), None);
        assert_eq!(p2.poll(), None);
        assert_eq!(p3.poll(), Some(Err(TransactionError::QueueFull)));
        assert_eq!(e.queue_len(), 2);

        // Non-stop motor commands are dropped too
        e.drive(10, t0);
        assert_eq!(e.queue_len(), 2);

        // A stop always gets in
        e.drive(0, t0);
        assert_eq!(e.queue_len(), 3);
        assert!(!e.is_feeding());
    }

    #[test]
    fn test_drive_feeds_watchdog() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        e.drive(0x20, t0);
        assert_eq!(e.speed(), 0x50);
        assert!(e.is_feeding());
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Motor, 0x50)]);
        e.on_bytes(&response(PacketType::Motor, 0x50), t0);

        // Feed resends the same speed
        e.poll(t0 + ms(100));
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Motor, 0x50)]);
        e.on_bytes(&response(PacketType::Motor, 0x50), t0 + ms(101));

        // Stop cancels the feed and sends the stop value
        e.drive(0, t0 + ms(150));
        assert!(!e.is_feeding());
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Motor, 0x30)]);
        e.on_bytes(&response(PacketType::Motor, 0x30), t0 + ms(151));

        e.poll(t0 + ms(300));
        assert!(e.take_outbox().is_empty());

        // The next non-stop speed starts the feed again
        e.drive(0x07, t0 + ms(300));
        assert!(e.is_feeding());
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Motor, 0x37)]);
        e.on_bytes(&response(PacketType::Motor, 0x37), t0 + ms(301));

        e.poll(t0 + ms(400));
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Motor, 0x37)]);
    }

    #[test]
    fn test_drive_limit() {
        let t0 = Instant::now();
        let mut e = Engine::new(&DriverParams {
            limit_factor: 0.4,
            ..params()
        });

        // Offsets are -0x20 and +0x60, limited to 40 %
        assert_eq!(e.speed_limit(), (-13, 38));

        e.drive(100, t0);
        assert_eq!(e.speed(), 0x30 + 38);

        e.drive(-100, t0);
        assert_eq!(e.speed(), 0x30 - 13);
    }

    #[test]
    fn test_disable_fails_outstanding() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        let p1 = e.request(PacketType::Ping, 0, t0);
        let p2 = e.request(PacketType::Version, 0, t0);
        e.drive(5, t0);

        e.disable();

        assert_eq!(p1.poll(), Some(Err(TransactionError::Disabled)));
        assert_eq!(p2.poll(), Some(Err(TransactionError::Disabled)));
        assert!(!e.is_feeding());
        assert!(e.take_outbox().is_empty());
    }

    #[test]
    fn test_write_error_fails_head() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());

        let p1 = e.request(PacketType::Ping, 0, t0);
        let p2 = e.request(PacketType::Version, 0, t0);
        e.take_outbox();

        e.on_write_error(std::io::ErrorKind::BrokenPipe, t0);

        assert_eq!(p1.poll(), Some(Err(TransactionError::Write(std::io::ErrorKind::BrokenPipe))));
        assert_eq!(p2.poll(), None);
        assert_eq!(frames(&e.take_outbox()), vec![Frame::request(PacketType::Version, 0)]);
    }

    #[test]
    fn test_dropped_engine_disconnects_pending() {
        let t0 = Instant::now();
        let mut e = Engine::new(&params());
        let p = e.request(PacketType::Ping, 0, t0);
        drop(e);
        assert_eq!(p.poll(), Some(Err(TransactionError::Disabled)));
    }
}
