/// Settings loading: files, environment, validation.
pub mod config;
/// Router and configuration errors.
pub mod error;
/// Structured logging (filters, formats, sinks).
pub mod logging;
/// Message routing core: mailboxes, registry, topic index, router.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use config::{EmptyChannelPolicy, LivenessConfig, RouterConfig, Settings};
pub use error::{ConfigError, RouterError, RouterResult};
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
pub use pubsub::{
    spawn_liveness_task, DeliveryOutcome, DeliveryReport, DeliverySink, Destination, Envelope,
    EvictionReason, LivenessMonitor, Mailbox, Message, MessageBuilder, Priority, Rejection, Router,
    RouterStats, Sink, Subscriber, SubscriberRegistry, TopicIndex,
};
pub use switchyard_error::{ErrorExt, StatusCode};
