//! Console-based notifier for development

use super::Notifier;

/// Notifier that logs to console (for development)
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ConsoleNotifier {
    fn send_expiry_warning(
        &self,
        email: &str,
        case_id: &str,
        hours_left: i64,
    ) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  EXPIRY WARNING FOR: {}", email);
        println!("  CASE: {}", case_id);
        println!("  HOURS LEFT: {}", hours_left);
        println!("========================================");
        println!();

        tracing::info!(email = %email, case_id = %case_id, hours_left, "Expiry warning sent");

        Ok(())
    }
}
