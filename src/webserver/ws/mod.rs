/// Real-time WebSocket hub
///
/// Multiplexes many long-lived client connections and fans scoped events
/// out to them. One actor loop owns all connection state; backend code
/// publishes through the `EventDispatcher` façade and never touches
/// sessions directly.
///
/// ## Key Components
/// - `hub`: single event loop serializing register/unregister/broadcast
/// - `session`: per-connection read/write pumps and lifecycle
/// - `message`: wire envelope and control message schemas
/// - `dispatch`: publish façade for arbitrary backend handlers
/// - `metrics`: hub-level counters for monitoring
/// - `sources`: in-process producers feeding the hub
pub mod dispatch;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod session;
pub mod sources;

pub use dispatch::EventDispatcher;
pub use hub::{Hub, HubHandle};
pub use message::{Event, EventKind};
