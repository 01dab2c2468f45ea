//! `simlink-middleware` – The Message Graph
//!
//! Routes data between simulated devices and their consumers without caring
//! about the data's meaning.
//!
//! # Modules
//!
//! - [`bus`] – named-topic publish/subscribe [`MessageBus`] built on Tokio
//!   broadcast channels.
//! - [`node`] – the [`HostNode`] trait a device manager is hosted by (bus
//!   access plus recurring timers) and [`ManualNode`], a deterministic host
//!   whose timers fire only on request.

pub mod bus;
pub mod node;

pub use bus::{DEFAULT_CAPACITY, MessageBus, TopicPublisher, TopicReceiver};
pub use node::{HostNode, ManualNode, TimerCallback};
