//! Tunables of a connection, carried as one value object.

/// Default capacity of the session input and output buffers
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Default maximum length of a single head line
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024;

/// Default maximum number of header fields in one head
pub const DEFAULT_MAX_HEADER_COUNT: usize = 64;

/// Default maximum size in bytes of the whole head, start line included
pub const DEFAULT_MAX_HEAD_SIZE: usize = 8 * 1024;

/// Limits enforced by the message parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageConstraints {
    pub max_line_length: usize,
    pub max_header_count: usize,
    pub max_head_size: usize,
}

impl Default for MessageConstraints {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_header_count: DEFAULT_MAX_HEADER_COUNT,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
        }
    }
}

impl MessageConstraints {
    #[must_use]
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    #[must_use]
    pub fn with_max_header_count(mut self, max_header_count: usize) -> Self {
        self.max_header_count = max_header_count;
        self
    }

    #[must_use]
    pub fn with_max_head_size(mut self, max_head_size: usize) -> Self {
        self.max_head_size = max_head_size;
        self
    }
}

/// Configuration handed to the connection factories.
///
/// `fragment_size_hint` bounds how many body bytes a content encoder accepts per
/// `write` call before the output buffer is considered full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub buffer_size: usize,
    pub fragment_size_hint: usize,
    pub constraints: MessageConstraints,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { buffer_size: DEFAULT_BUFFER_SIZE, fragment_size_hint: DEFAULT_BUFFER_SIZE, constraints: MessageConstraints::default() }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the buffer size, the fragment hint follows it unless set explicitly afterwards.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self.fragment_size_hint = buffer_size;
        self
    }

    #[must_use]
    pub fn with_fragment_size_hint(mut self, fragment_size_hint: usize) -> Self {
        self.fragment_size_hint = fragment_size_hint;
        self
    }

    #[must_use]
    pub fn with_constraints(mut self, constraints: MessageConstraints) -> Self {
        self.constraints = constraints;
        self
    }
}
