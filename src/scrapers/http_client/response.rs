//! HTTP response wrapper.

/// Status and body of one GET.
///
/// The body is only read for non-error statuses; error responses carry an
/// empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Check if the status signals a client or server error.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}
