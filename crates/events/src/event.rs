use chrono::{DateTime, Utc};

/// A recorded fact about a shop document or catalog entry.
///
/// Once emitted an event is never edited; a correction is a new event.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, `<context>.<document>.<fact>` (e.g. `catalog.product.pricing_changed`).
    fn event_type(&self) -> &'static str;

    /// Payload schema revision, bumped when fields change meaning.
    fn version(&self) -> u32;

    /// Shop time of the fact, not the time it was published.
    fn occurred_at(&self) -> DateTime<Utc>;
}
