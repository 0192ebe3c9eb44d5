//! Observability (component J): the retry helper, notification targets,
//! and event bus that sit alongside the core liquidation pipeline.

pub mod events;
pub mod notification;
pub mod retrier;

pub use events::{EventBus, LiquidationEvent, ScoutReport};
pub use notification::NotificationTarget;
pub use retrier::retry;
