//! Background workers owned by the runtime.
//!
//! The server session worker owns the authoritative collection and is the
//! only place where it is mutated.

mod server;

pub(crate) use server::{Command, ServerSession};
