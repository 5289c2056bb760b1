//! The coordination hub: request broker, state sync, shutdown sequencing.
//!
//! Four components cooperate behind one actor task:
//!
//! - [`SurfaceRegistry`] - the live set of surfaces and their outbound channels
//! - [`RequestBroker`] - RPC forwarding and response correlation by request id
//! - [`StateSyncHub`] - snapshot scheduling and mutation fan-out
//! - [`ShutdownCoordinator`] - the graceful-termination state machine
//!
//! # Architecture
//!
//! All four run inside a single actor task ([`start_hub`]) that owns every
//! map and processes one [`HubCommand`] to completion before the next. No
//! shared registry is ever touched from outside the actor; callers hold a
//! cloneable [`HubHandle`] and communicate only via message passing. Blocking
//! calls are oneshot futures the caller awaits - the hub itself never blocks
//! waiting for a reply.

pub mod broker;
pub mod handle;
pub mod hooks;
pub mod registry;
pub mod shutdown;
pub mod state;
pub mod sync;

pub use broker::{PendingCaller, RequestBroker};
pub use handle::HubHandle;
pub use hooks::{HostHooks, NullHooks};
pub use registry::{SurfaceEntry, SurfaceRegistry};
pub use shutdown::{ShutdownCoordinator, ShutdownState};
pub use state::{HubCommand, start_hub};
pub use sync::StateSyncHub;
