//! # sbsamples core
//!
//! Shared plumbing for the Service Bus sample programs: credentials, entity
//! addressing, SDK client wrappers, message building and inspection, and the
//! management plane.
//!
//! ## Modules
//!
//! - [`amqp`] - Raw AMQP 1.0 links, optionally tunnelled through an HTTP proxy
//! - [`auth`] - Connection strings, SAS signing and Azure AD tokens
//! - [`client`] - Service Bus client producing senders and receivers
//! - [`common`] - Error types
//! - [`consumer`] - Receiving, peeking and settling messages
//! - [`entity`] - Queue, subscription and dead-letter addresses
//! - [`handler`] - Message pump driving a handler callback
//! - [`link`] - SDK sender and receiver seams behind producers and consumers
//! - [`management`] - Entity management through Azure Resource Manager
//! - [`message`] - Outgoing message builder and received message view
//! - [`model`] - Payload records used by the samples
//! - [`producer`] - Sending and scheduling messages
//! - [`utils`] - Environment helpers

pub mod amqp;
pub mod auth;
pub mod client;
pub mod common;
pub mod consumer;
pub mod entity;
pub mod handler;
pub mod link;
pub mod management;
pub mod message;
pub mod model;
pub mod producer;
pub mod utils;

pub use common::{SampleError, SampleResult};
