//! Remote shell and command identifiers.

use std::fmt;

/// Identifier of a remote shell, as assigned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShellId(String);

/// Identifier of a command running inside a remote shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandId(String);

macro_rules! remote_id {
    ($name:ident) => {
        impl $name {
            /// Wrap an identifier returned by the remote host.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the identifier as sent on the wire.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

remote_id!(ShellId);
remote_id!(CommandId);
