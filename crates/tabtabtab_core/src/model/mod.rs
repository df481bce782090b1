//! Value model exchanged between the host and extensions.
//!
//! # Responsibility
//! - Define the immutable records handlers receive and return.
//! - Own the fixed wire shapes those records serialize to.
//!
//! # Invariants
//! - Equality is structural; no record has a lifecycle beyond one event.
//! - Serialization is total: every well-formed value renders to JSON.

pub mod context;
pub mod notification;
pub mod response;

use log::error;
use serde::Serialize;
use serde_json::Value;

/// Total rendering of a value into its documented JSON wire shape.
///
/// Implemented for every `Serialize` type, so the serde attributes on each
/// record are the only definition of its wire keys.
pub trait ToJson {
    fn to_json(&self) -> Value;
}

impl<T: Serialize> ToJson for T {
    fn to_json(&self) -> Value {
        // Model records only hold string-keyed maps, so this cannot fail in practice.
        serde_json::to_value(self).unwrap_or_else(|err| {
            error!(
                "event=serialize_failed module=model status=error error={}",
                err
            );
            Value::Null
        })
    }
}
