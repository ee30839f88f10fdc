//! # Message Bus
//!
//! Topic based publish/subscribe messaging between convoy nodes. Each message is sent as a two
//! part ZMQ message: the topic followed by the ASCII payload. Subscriptions filter on the topic
//! part, which ZMQ matches by prefix, so received topics are additionally compared exactly.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};

use crate::net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters of the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusParams {
    /// Endpoint of the publisher this node subscribes to, e.g. `tcp://sp-master:4444`
    pub sub_endpoint: String,

    /// Endpoint this node publishes its own telemetry on, if any, e.g. `tcp://*:4445`
    #[serde(default)]
    pub pub_endpoint: Option<String>,

    /// Timeout for blocking receives in milliseconds
    #[serde(default = "BusParams::default_recv_timeout_ms")]
    pub recv_timeout_ms: i32,
}

/// A message received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

/// Client side of the message bus.
pub struct BusClient {
    sub_socket: MonitoredSocket,

    pub_socket: Option<MonitoredSocket>,

    topics: Vec<String>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum BusError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to {0}: {1}")]
    SubscribeError(String, zmq::Error),

    #[error("Could not publish on {0}: {1}")]
    PublishError(String, zmq::Error),

    #[error("This client was not configured with a publish endpoint")]
    NoPublisher,

    #[error("Could not recieve a message from the bus: {0}")]
    RecvError(zmq::Error),

    #[error("Recieved a message which was not valid UTF-8")]
    NonUtf8Message,

    #[error("Recieved a message with {0} parts, expected 2")]
    MalformedMessage(usize),

    #[error("Payload {0:?} of {1} is not an integer")]
    NotAnInteger(String, String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BusParams {
    fn default_recv_timeout_ms() -> i32 {
        500
    }
}

impl BusMessage {
    /// Parse the payload as an ASCII integer.
    pub fn parse_int(&self) -> Result<i32, BusError> {
        self.payload
            .trim()
            .parse()
            .map_err(|_| BusError::NotAnInteger(self.payload.clone(), self.topic.clone()))
    }
}

impl BusClient {
    /// Connect to the bus.
    ///
    /// This function does not wait for the publisher to be reachable, messages simply start
    /// arriving once it is.
    pub fn new(ctx: &zmq::Context, params: &BusParams) -> Result<Self, BusError> {
        let sub_options = SocketOptions {
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 0,
            recv_timeout: params.recv_timeout_ms,
            ..Default::default()
        };

        let sub_socket =
            MonitoredSocket::new(ctx, zmq::SUB, sub_options, &params.sub_endpoint)
                .map_err(BusError::SocketError)?;

        let pub_socket = match params.pub_endpoint {
            Some(ref endpoint) => {
                let pub_options = SocketOptions {
                    bind: true,
                    linger: 0,
                    send_timeout: 10,
                    ..Default::default()
                };
                Some(
                    MonitoredSocket::new(ctx, zmq::PUB, pub_options, endpoint)
                        .map_err(BusError::SocketError)?,
                )
            }
            None => None,
        };

        Ok(Self {
            sub_socket,
            pub_socket,
            topics: Vec::new(),
        })
    }

    /// Subscribe to a topic.
    pub fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.sub_socket
            .set_subscribe(topic.as_bytes())
            .map_err(|e| BusError::SubscribeError(topic.into(), e))?;
        self.topics.push(topic.into());

        debug!("Subscribed to {}", topic);

        Ok(())
    }

    /// Publish a payload on a topic.
    pub fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        let socket = self.pub_socket.as_ref().ok_or(BusError::NoPublisher)?;

        socket
            .send_multipart(vec![topic.as_bytes(), payload.as_bytes()], 0)
            .map_err(|e| BusError::PublishError(topic.into(), e))
    }

    /// True if the subscriber socket is connected to the publisher.
    pub fn connected(&self) -> bool {
        self.sub_socket.connected()
    }

    /// Receive the next message without blocking.
    ///
    /// Returns `Ok(None)` if no message is waiting.
    pub fn try_recv(&self) -> Result<Option<BusMessage>, BusError> {
        self.recv_with_flags(zmq::DONTWAIT)
    }

    /// Receive the next message, blocking for at most the configured receive timeout.
    ///
    /// Returns `Ok(None)` if the timeout elapsed.
    pub fn recv(&self) -> Result<Option<BusMessage>, BusError> {
        self.recv_with_flags(0)
    }

    fn recv_with_flags(&self, flags: i32) -> Result<Option<BusMessage>, BusError> {
        loop {
            let parts = match self.sub_socket.recv_multipart(flags) {
                Ok(p) => p,
                Err(zmq::Error::EAGAIN) => return Ok(None),
                Err(e) => return Err(BusError::RecvError(e)),
            };

            if parts.len() != 2 {
                return Err(BusError::MalformedMessage(parts.len()));
            }

            let mut parts = parts.into_iter();
            let topic = parts
                .next()
                .map(String::from_utf8)
                .and_then(Result::ok)
                .ok_or(BusError::NonUtf8Message)?;
            let payload = parts
                .next()
                .map(String::from_utf8)
                .and_then(Result::ok)
                .ok_or(BusError::NonUtf8Message)?;

            // ZMQ matched a prefix only, skip topics we didn't ask for
            if self.topics.iter().any(|t| *t == topic) {
                return Ok(Some(BusMessage { topic, payload }));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_int() {
        let m = BusMessage {
            topic: "sp/motor".into(),
            payload: " -12\n".into(),
        };
        assert_eq!(m.parse_int().unwrap(), -12);

        let bad = BusMessage {
            topic: "sp/motor".into(),
            payload: "fast".into(),
        };
        assert!(matches!(bad.parse_int(), Err(BusError::NotAnInteger(_, _))));
    }
}
