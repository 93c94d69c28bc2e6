//! Client side of the synccast remote-playback protocol.
//!
//! One persistent connection multiplexes correlated calls, fire-and-forget
//! notifications, broadcast fan-out and chunked binary media transfer. On
//! top sits a playback controller that keeps a viewer's position converged
//! with a host's within a bounded tolerance.
//!
//! Everything runs on one cooperative execution context: `invoke` suspends
//! until its response arrives, and the chunk streamer suspends between
//! backpressure polls. Nothing blocks a thread.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod hooks;
pub mod player;
pub mod registry;
pub mod router;
pub mod trace;
pub mod transfer;

pub use client::ModelClient;
pub use config::{SyncConfig, TransferConfig};
pub use connection::{Connection, Frame, PairedConnection};
pub use error::{ClientError, ClientResult};
pub use hooks::Hooks;
pub use player::{ChunkSource, MediaPipeline, Role, SyncPlayer};
pub use registry::RequestRegistry;
pub use router::MessageRouter;
pub use transfer::ChunkSender;
