//! UDP broadcast fallback for display discovery.
//!
//! A display that cannot rely on the service directory also shouts
//! `GAMETUX_DISPLAY:<port>` to the LAN broadcast address on a fixed UDP port.
//! Consoles listen on that port and treat the datagram's source IP plus the
//! announced port as the display's signaling address.
//!
//! - [`Announcer`] sends the datagram on an interval until stopped.
//! - [`AnnouncementListener`] receives datagrams and reports well-formed ones.
//!
//! Both loops exit when their shutdown channel fires; the socket is owned by
//! the loop and closes with it.

mod announcement;
mod announcer;
mod listener;

pub use announcement::{
    encode_announcement, parse_announcement, ANNOUNCE_PREFIX, MAX_ANNOUNCEMENT_LEN,
};
pub use announcer::Announcer;
pub use listener::AnnouncementListener;
