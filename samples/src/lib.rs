//! Azure Service Bus sample programs.
//!
//! Each binary under `src/bin` wires one sample's `run` function to the
//! shared launcher in [`cli`], which handles flags, environment variables,
//! settings, logging and exit codes.

pub mod amqp;
pub mod cli;
pub mod console;
pub mod logger;
pub mod management;
pub mod queues;
pub mod settings;
pub mod topics;
