//! Cross-instance event fan-out.
//!
//! Broadcasts issued on one server process must reach connections held by
//! every other process. The [`EventBus`] trait is the seam: production wires
//! [`RedisEventBus`] (Redis pub/sub), tests wire [`MemoryBus`].

mod bus;
mod channels;
mod publisher;
mod subscriber;

pub use bus::{BusError, BusResult, EventBus, MemoryBus, RedisEventBus};
pub use channels::{BusChannel, BROADCAST_CHANNEL, CHANNEL_PREFIX, USER_PREFIX};
pub use publisher::{BusEvent, EventTarget, Publisher};
pub use subscriber::{BusMessage, Subscriber, SubscriberConfig, SubscriberError, SubscriberResult};
