//! Who may record attendance, and how a record is classified.
//!
//! Rules:
//! - An attendee scanning the event code on their own device needs no rights.
//! - Anyone recording on behalf of someone else (staff scan or manual entry)
//!   must be a college admin or an approved admin of the owning club.

use crate::protocol::models::{AttendanceMethod, Identity, Role};
use crate::RollcallError;

/// Classify a scan by who performed it.
pub fn scan_method(scanner_id: &str, attendee_id: &str) -> AttendanceMethod {
    if scanner_id == attendee_id {
        AttendanceMethod::SelfScan
    } else {
        AttendanceMethod::StaffScan
    }
}

/// Whether this actor's role alone settles the question.
///
/// College admins may record for every club; nobody else can be decided
/// without asking the membership store.
pub fn needs_membership_lookup(actor: &Identity) -> bool {
    actor.role != Role::CollegeAdmin
}

/// Check that an actor may record attendance for someone else.
///
/// # Arguments
/// * `actor` - The signed-in user performing the write
/// * `is_owning_club_admin` - Whether the actor is an approved admin of the
///   event's owning club
///
/// # Returns
/// * `Ok(())` - Write allowed
/// * `Err(Unauthorized)` - Actor lacks rights on the owning club
pub fn check_recording_rights(
    actor: &Identity,
    is_owning_club_admin: bool,
) -> Result<(), RollcallError> {
    match actor.role {
        Role::CollegeAdmin => Ok(()),
        Role::ClubAdmin | Role::Attendee if is_owning_club_admin => Ok(()),
        _ => Err(RollcallError::Unauthorized),
    }
}
