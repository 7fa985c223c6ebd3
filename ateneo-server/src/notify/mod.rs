//! Expiry notification abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleNotifier;
pub use smtp::{SmtpConfig, SmtpNotifier};

/// Trait for warning professionals about debates close to expiry
pub trait Notifier: Send + Sync {
    /// Warn a professional that an open debate will be released soon
    fn send_expiry_warning(&self, email: &str, case_id: &str, hours_left: i64)
        -> Result<(), String>;
}

/// Allow using Box<dyn Notifier> as a Notifier
impl Notifier for Box<dyn Notifier> {
    fn send_expiry_warning(
        &self,
        email: &str,
        case_id: &str,
        hours_left: i64,
    ) -> Result<(), String> {
        (**self).send_expiry_warning(email, case_id, hours_left)
    }
}
