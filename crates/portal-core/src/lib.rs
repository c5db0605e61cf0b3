// # portal-core
//
// Core library for a Wi-Fi captive portal: the device runs its own access
// point, answers every DNS query with its own address, and serves a small
// web UI that reads and writes device variables.
//
// ## Architecture Overview
//
// - **codec**: Domain name wire encoding and a bounded byte cursor
// - **DnsResponder**: Answers A/ANY queries with one address, NXDOMAIN for blocked names
// - **HttpRouter**: One request per connection, fixed path table, captive-portal probes
// - **DataPointRegistry**: Named, typed device variables readable and writable as text
// - **PathHandler**: Trait implemented by every web page or action
// - **PortalEngine**: Binds both listeners and drives them until shutdown
//
// ## Design Principles
//
// 1. **Bounded**: Every table has a fixed capacity, every read a byte cap
// 2. **Library-First**: All functionality can be used without the daemon
// 3. **Pure protocol cores**: DNS and routing logic run on buffers and
//    generic streams, sockets live in the engine

pub mod codec;
pub mod config;
pub mod dns;
pub mod engine;
pub mod error;
pub mod http;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{DnsConfig, EngineConfig, HttpConfig, PortalConfig};
pub use dns::{BlockList, DnsResponder, Verdict};
pub use engine::{PortalEngine, PortalEvent};
pub use error::{Error, Result};
pub use http::{HttpRouter, Method, Methods, WebPath};
pub use registry::{DataPoint, DataPointRegistry, DataType, Value, ValueSlot};
pub use traits::PathHandler;
