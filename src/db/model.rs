//! View models used by repositories and the outbox worker.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

/// Contact-message slice used by the outbox worker when sending the
/// notification email.
#[derive(Debug, Clone)]
pub struct ContactForOutbox {
    pub reference: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}
