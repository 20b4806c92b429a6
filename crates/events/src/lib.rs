//! Domain events and their distribution.
//!
//! Purchasing, inventory and catalog changes are facts; the pricing engine reacts to
//! some of them (a recorded inventory count drives one calibration pass).

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
