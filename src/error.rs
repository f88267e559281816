//! Error types and handling for shmlink

/// Result type alias for shmlink operations
pub type Result<T> = std::result::Result<T, ShmLinkError>;

/// Error taxonomy shared by every component of the crate
#[derive(Debug, thiserror::Error)]
pub enum ShmLinkError {
    /// Invalid parameters (zero size, malformed name, reserved name, ...)
    #[error("Invalid argument: {parameter} - {message}")]
    InvalidArgument { parameter: String, message: String },

    /// The OS shared-memory primitive could not be created, opened or mapped
    #[error("Resource unavailable: {name}: {message}")]
    ResourceUnavailable {
        name: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// An encoder or decoder access would leave the destination buffer
    #[error("Out of bounds: offset {offset} + length {length} exceeds capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        length: usize,
        capacity: usize,
    },

    /// The shared configuration store rejected a create-or-update
    #[error("Store failure: {message}")]
    StoreFailure { message: String },

    /// Failure reported by a channel transport
    #[error("Transport error on {channel} channel: {message}")]
    Transport { channel: String, message: String },

    /// Malformed encoded data
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl ShmLinkError {
    /// Create an invalid argument error
    pub fn invalid_argument(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a resource unavailable error without an underlying I/O error
    pub fn resource_unavailable(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            name: name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a resource unavailable error from a standard I/O error
    pub fn from_io(name: impl Into<String>, source: std::io::Error, context: &str) -> Self {
        Self::ResourceUnavailable {
            name: name.into(),
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create an out of bounds error
    pub fn out_of_bounds(offset: usize, length: usize, capacity: usize) -> Self {
        Self::OutOfBounds {
            offset,
            length,
            capacity,
        }
    }

    /// Create a store failure
    pub fn store_failure(message: impl Into<String>) -> Self {
        Self::StoreFailure {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<bincode::Error> for ShmLinkError {
    fn from(err: bincode::Error) -> Self {
        Self::serialization(format!("Bincode error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ShmLinkError::invalid_argument("size", "must be greater than 0");
        assert!(matches!(err, ShmLinkError::InvalidArgument { .. }));

        let err = ShmLinkError::out_of_bounds(10, 8, 12);
        assert!(matches!(
            err,
            ShmLinkError::OutOfBounds {
                offset: 10,
                length: 8,
                capacity: 12
            }
        ));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ShmLinkError::from_io("cfg-region", io, "Failed to open");
        match err {
            ShmLinkError::ResourceUnavailable { name, source, .. } => {
                assert_eq!(name, "cfg-region");
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = ShmLinkError::transport("control", "queue full");
        let display = format!("{}", err);
        assert!(display.contains("control channel"));
        assert!(display.contains("queue full"));

        let err = ShmLinkError::store_failure("registry full");
        assert!(format!("{}", err).contains("Store failure"));
    }
}
