//! Twined function handlers.
//!
//! This crate provides the three independent handlers ([`EventHandler`],
//! [`TopicSweeper`] and [`ServiceRegistry`]), each a single pass over its
//! input with no state kept between invocations.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Handlers sequence calls between the domain rules
//! in the [`events`] crate and the port traits (event store, job dispatcher,
//! topic admin, image registry). They contain no domain rules of their own
//! and know nothing about HTTP; the `listener` crate adapts them to requests.

pub mod event_handler;
pub mod helper;
pub mod service_registry;

pub use event_handler::{DispatchOutcome, EventHandler, EventHandlerError, HandledEvent, KueueDispatch};
pub use helper::{HelperError, HelperOutcome, TopicSweeper};
pub use service_registry::ServiceRegistry;
