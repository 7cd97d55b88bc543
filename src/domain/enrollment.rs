//! Enrollment domain entity: membership of a user in a course.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "ACTIVE",
            EnrollmentStatus::Completed => "COMPLETED",
            EnrollmentStatus::Dropped => "DROPPED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(EnrollmentStatus::Active),
            "COMPLETED" => Some(EnrollmentStatus::Completed),
            "DROPPED" => Some(EnrollmentStatus::Dropped),
            _ => None,
        }
    }

    /// ACTIVE and COMPLETED rows block re-enrollment; DROPPED rows do not.
    pub fn is_current(&self) -> bool {
        matches!(self, EnrollmentStatus::Active | EnrollmentStatus::Completed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(user_id: Uuid, course_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            status: EnrollmentStatus::Active,
            enrolled_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_dropped_is_not_current() {
        assert!(EnrollmentStatus::Active.is_current());
        assert!(EnrollmentStatus::Completed.is_current());
        assert!(!EnrollmentStatus::Dropped.is_current());
    }

    #[test]
    fn new_enrollment_is_active() {
        let enrollment = Enrollment::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(enrollment.status, EnrollmentStatus::Active);
        assert!(enrollment.completed_at.is_none());
    }
}
