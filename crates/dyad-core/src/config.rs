use dyad_api::types::ValidationLimits;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    /// Delay before a message pushed to an online recipient is automatically
    /// confirmed as read, presence permitting.
    pub auto_read_delay_ms: u64,
    pub max_body_bytes: usize,
    pub max_identity_len: usize,
    pub enable_typing: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let limits = ValidationLimits::default();
        Self {
            auto_read_delay_ms: 2000,
            max_body_bytes: limits.max_body_bytes,
            max_identity_len: limits.max_identity_len,
            enable_typing: true,
        }
    }
}

impl CoreConfig {
    pub fn limits(&self) -> ValidationLimits {
        ValidationLimits {
            max_body_bytes: self.max_body_bytes,
            max_identity_len: self.max_identity_len,
        }
    }
}
