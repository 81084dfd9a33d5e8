/// Counters accumulated over the lifetime of one connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionMetrics {
    request_count: u64,
    response_count: u64,
    bytes_received: u64,
    bytes_sent: u64,
}

impl ConnectionMetrics {
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn response_count(&self) -> u64 {
        self.response_count
    }

    /// Bytes read from the session, message heads included.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Bytes flushed to the session, message heads included.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn incr_request_count(&mut self) {
        self.request_count += 1;
    }

    pub(crate) fn incr_response_count(&mut self) {
        self.response_count += 1;
    }

    pub(crate) fn add_bytes_received(&mut self, n: usize) {
        self.bytes_received += n as u64;
    }

    pub(crate) fn add_bytes_sent(&mut self, n: usize) {
        self.bytes_sent += n as u64;
    }
}
