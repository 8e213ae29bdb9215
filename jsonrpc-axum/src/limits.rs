//! Request size limits for the HTTP surface.

/// Default maximum request body size (4 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Limits applied to inbound request bodies.
///
/// # Example
///
/// ```rust
/// use jsonrpc_axum::MessageLimits;
///
/// // Default 4 MiB limit
/// let limits = MessageLimits::default();
///
/// // 16 MiB for batch-heavy tooling
/// let limits = MessageLimits::new(16 * 1024 * 1024);
///
/// // No limit (trusted networks only)
/// let limits = MessageLimits::unlimited();
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageLimits {
    max_message_size: Option<usize>,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_message_size: Some(DEFAULT_MAX_MESSAGE_SIZE),
        }
    }
}

impl MessageLimits {
    /// Limit request bodies to `max_message_size` bytes.
    pub fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size: Some(max_message_size),
        }
    }

    /// Accept request bodies of any size.
    pub fn unlimited() -> Self {
        Self {
            max_message_size: None,
        }
    }

    /// Returns the maximum body size, or `None` if unlimited.
    pub fn max_message_size(&self) -> Option<usize> {
        self.max_message_size
    }
}
