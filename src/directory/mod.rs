//! Service directory: advertise and browse the display service on the LAN.
//!
//! The directory is the primary discovery path. A display registers a record
//! of type [`SERVICE_TYPE`] named [`SERVICE_NAME`] bound to its signaling
//! port; consoles browse for that type and get a feed of resolved addresses.
//!
//! Backends:
//! - [`MdnsDirectory`]: multicast DNS-SD via `mdns-sd`.
//! - [`LocalDirectory`]: an in-process directory for single-host setups and
//!   tests.

use std::pin::Pin;

use futures_util::Stream;

use crate::peer::PeerAddress;
use crate::Result;

mod local;
mod mdns;

pub use local::LocalDirectory;
pub use mdns::MdnsDirectory;

/// DNS-SD service type of the display.
pub const SERVICE_TYPE: &str = "_gametux._tcp.local.";

/// Instance name the display registers under.
pub const SERVICE_NAME: &str = "GametuxDisplay";

/// Feed of service appearances resolved to concrete addresses.
///
/// Removals are not propagated; the feed is append-only.
pub type ResolvedFeed = Pin<Box<dyn Stream<Item = PeerAddress> + Send>>;

/// A platform service-discovery mechanism.
///
/// All stop operations must be idempotent and safe to call when the
/// matching start never happened.
pub trait ServiceDirectory: Send + Sync + 'static {
    /// Human-readable name for logging (e.g. "mdns").
    fn name(&self) -> &'static str;

    /// Register the display service bound to `port`.
    fn advertise(&self, port: u16) -> Result<()>;

    /// Withdraw the registration made by [`advertise`](Self::advertise).
    fn stop_advertising(&self) -> Result<()>;

    /// Start watching for the display service.
    ///
    /// Resolution failures are logged by the backend and never reach the
    /// feed.
    fn browse(&self) -> Result<ResolvedFeed>;

    /// Stop watching. Open feeds end or are dropped by the caller.
    fn stop_browsing(&self) -> Result<()>;
}
