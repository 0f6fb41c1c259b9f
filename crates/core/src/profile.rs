//! The signed-in student's profile record.

use serde::{Deserialize, Serialize};

use crate::types::{CanteenId, Email, Gender, HostelId, Role, UserId};

/// A row of the `profiles` table.
///
/// Mirrored into the visitor's session after login or session restore and
/// dropped on logout. The storefront never writes it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub phone: String,
    pub hostel_id: HostelId,
    pub preferred_canteen_id: CanteenId,
    pub gender: Gender,
    #[serde(default)]
    pub role: Role,
}

impl UserProfile {
    /// First word of the full name, for greetings in the header.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next()
            .unwrap_or(self.email.local_part())
    }

    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}
