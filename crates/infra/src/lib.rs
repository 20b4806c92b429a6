//! Infrastructure layer: in-memory logs and catalog behind the engine's ports, and
//! the recorder that stores shop documents before announcing them on the bus.

pub mod read_model;
pub mod recorder;
