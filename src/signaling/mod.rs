//! Line-oriented signaling over short-lived TCP connections.
//!
//! Each exchange is one connection carrying one request line and at most one
//! response line, both newline terminated:
//!
//! ```text
//! console -> display   OFFER:<description>
//! display -> console   ANSWER:<description>
//!
//! console -> display   ICE:<candidate>
//! display -> console   OK
//! ```
//!
//! The channel ([`SignalingClient`], [`SignalingServer`]) moves opaque lines;
//! [`SignalingMessage`] gives them their `TAG:payload` shape.
//!
//! Signaling is one-way: the display can only answer, never push. Candidates
//! the display gathers after answering have no path back to the console.

mod client;
mod config;
mod line;
mod message;
mod server;

pub use client::SignalingClient;
pub use config::{SignalingConfig, DEFAULT_SIGNALING_PORT};
pub use message::{SignalingMessage, ACK};
pub use server::{Responder, SignalingServer};
