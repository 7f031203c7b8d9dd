//! The seam between this layer and the host application.
//!
//! The host owns the live entity graph. It cannot be enumerated in bulk and
//! offers no change notifications: every interaction is a discrete round trip
//! against one [`EntityPath`]. Implement [`Host`] and [`Handle`] to connect a
//! real host; [`MemoryHost`](crate::MemoryHost) is the in-process
//! implementation used by tests and the CLI.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::EntityPath;

/// A single value exchanged with the host.
///
/// The host speaks in loosely-typed atoms; booleans travel as `0`/`1`
/// integers and object references as [`HostValue::Id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostValue {
    /// Integer atom.
    Int(i64),
    /// Floating point atom.
    Float(f64),
    /// Symbol or string atom.
    Str(String),
    /// Reference to another live object.
    Id(u64),
}

impl HostValue {
    /// Numeric view of the value. Strings parse if they look numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Int(v) => Some(*v as f64),
            HostValue::Float(v) => Some(*v),
            HostValue::Str(s) => s.trim().parse().ok(),
            HostValue::Id(_) => None,
        }
    }

    /// Integer view of the value. Floats are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HostValue::Int(v) => Some(*v),
            HostValue::Float(v) if v.is_finite() => Some(*v as i64),
            HostValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view: any non-zero number is `true`.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_f64().map(|v| v != 0.0)
    }

    /// String view, only for string atoms.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        HostValue::Int(i64::from(v))
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::Int(v)
    }
}

impl From<u8> for HostValue {
    fn from(v: u8) -> Self {
        HostValue::Int(i64::from(v))
    }
}

impl From<u32> for HostValue {
    fn from(v: u32) -> Self {
        HostValue::Int(i64::from(v))
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Float(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::Str(v.to_string())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::Str(v)
    }
}

impl std::fmt::Display for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostValue::Int(v) => write!(f, "{v}"),
            HostValue::Float(v) => write!(f, "{v}"),
            HostValue::Str(s) => write!(f, "{s}"),
            HostValue::Id(id) => write!(f, "id {id}"),
        }
    }
}

/// Failure reported by the host for a single round trip.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    /// The host graph cannot be reached right now (e.g. still starting up).
    #[error("host unreachable: {0}")]
    Unreachable(String),

    /// The call itself failed.
    #[error("{0}")]
    Call(String),
}

impl HostError {
    /// Convenience constructor for [`HostError::Call`].
    pub fn call(message: impl Into<String>) -> Self {
        HostError::Call(message.into())
    }
}

/// Result type for raw host round trips.
pub type HostResult<T> = Result<T, HostError>;

/// An open reference to one node of the host's live graph.
///
/// Handles are cheap, short-lived and never cached by this layer: the node
/// behind a path can change between two calls.
pub trait Handle {
    /// Host-assigned object id; `0` when the path resolves to nothing.
    fn id(&self) -> u64;

    /// The path this handle was opened at.
    fn path(&self) -> &EntityPath;

    /// Read a property.
    fn get(&self, property: &str) -> HostResult<HostValue>;

    /// Write a property.
    fn set(&self, property: &str, value: HostValue) -> HostResult<()>;

    /// Invoke a method on the node.
    fn call(&self, method: &str, args: &[HostValue]) -> HostResult<HostValue>;

    /// Number of children in the named list (`tracks`, `devices`, ...).
    fn child_count(&self, child: &str) -> HostResult<usize>;

    /// Read a numeric property.
    fn get_f64(&self, property: &str) -> HostResult<f64> {
        let value = self.get(property)?;
        value.as_f64().ok_or_else(|| {
            HostError::call(format!("property '{property}' is not numeric: {value}"))
        })
    }

    /// Read a boolean property.
    fn get_bool(&self, property: &str) -> HostResult<bool> {
        let value = self.get(property)?;
        value.as_bool().ok_or_else(|| {
            HostError::call(format!("property '{property}' is not boolean: {value}"))
        })
    }

    /// Read a string property. Numbers are rendered as text.
    fn get_string(&self, property: &str) -> HostResult<String> {
        Ok(self.get(property)?.to_string())
    }
}

/// A live host application.
pub trait Host {
    /// Handle type produced by [`Host::open`].
    type Handle: Handle;

    /// Open a handle at `path`.
    ///
    /// Opening a path that resolves to nothing is not an error: the handle
    /// reports id `0`. Errors mean the host itself could not be asked.
    fn open(&self, path: &EntityPath) -> HostResult<Self::Handle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_views() {
        assert_eq!(HostValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(HostValue::Float(2.9).as_i64(), Some(2));
        assert_eq!(HostValue::Str(" 0.5 ".into()).as_f64(), Some(0.5));
        assert_eq!(HostValue::Id(7).as_f64(), None);
    }

    #[test]
    fn bool_view_treats_nonzero_as_true() {
        assert_eq!(HostValue::Int(0).as_bool(), Some(false));
        assert_eq!(HostValue::Int(1).as_bool(), Some(true));
        assert_eq!(HostValue::Float(0.25).as_bool(), Some(true));
        assert_eq!(HostValue::Str("yes".into()).as_bool(), None);
    }

    #[test]
    fn conversions() {
        assert_eq!(HostValue::from(true), HostValue::Int(1));
        assert_eq!(HostValue::from(4u32), HostValue::Int(4));
        assert_eq!(HostValue::from("kick"), HostValue::Str("kick".into()));
    }

    #[test]
    fn display_renders_atoms() {
        assert_eq!(HostValue::Int(5).to_string(), "5");
        assert_eq!(HostValue::Id(12).to_string(), "id 12");
        assert_eq!(HostValue::Str("Bass".into()).to_string(), "Bass");
    }
}
