//! Case-id allocation

use uuid::Uuid;

/// Length of the opaque case identifier
pub const CASE_ID_LEN: usize = 8;

/// Generate a fresh case id: the first 8 hex characters of a v4 UUID.
/// Collisions are possible and handled by retrying the insert.
pub fn new_case_id() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(CASE_ID_LEN);
    token
}
