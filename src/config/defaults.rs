//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

// =============================================================================
// Push Defaults
// =============================================================================

pub fn default_notification_title() -> String {
    "Superfeed".to_string()
}

pub fn default_queue_depth() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_defaults() {
        assert_eq!(default_notification_title(), "Superfeed");
        assert_eq!(default_queue_depth(), 64);
    }
}
