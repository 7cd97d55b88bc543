//! Enrollment finalization and the synchronous free-course path.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::Enrollment;
use crate::error::AppError;
use crate::ports::{CourseCatalog, EnrollmentStore, StoreResult};

pub struct EnrollmentService {
    enrollments: Arc<dyn EnrollmentStore>,
    catalog: Arc<dyn CourseCatalog>,
}

impl EnrollmentService {
    pub fn new(enrollments: Arc<dyn EnrollmentStore>, catalog: Arc<dyn CourseCatalog>) -> Self {
        Self {
            enrollments,
            catalog,
        }
    }

    /// Idempotent: an existing ACTIVE/COMPLETED enrollment for the pair is
    /// returned unchanged. This is what makes webhook reconciliation safe to
    /// re-run.
    pub async fn finalize(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<Enrollment> {
        let enrollment = Enrollment::new(user_id, course_id);
        self.enrollments.insert_or_get(&enrollment).await
    }

    /// Direct enrollment for free courses; priced courses are redirected to
    /// the payment flow.
    pub async fn enroll_free(&self, user_id: Uuid, course_id: Uuid) -> Result<Enrollment, AppError> {
        let course = self
            .catalog
            .find_published(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("course not found or not available".to_string()))?;

        if self
            .enrollments
            .find_current(user_id, course_id)
            .await?
            .is_some()
        {
            return Err(AppError::Validation(
                "already enrolled in this course".to_string(),
            ));
        }

        if !course.is_free() {
            return Err(AppError::PaymentRequired(format!(
                "course costs {} {}",
                course.price, course.currency
            )));
        }

        let enrollment = self.finalize(user_id, course_id).await?;
        tracing::info!(
            user_id = %user_id,
            course_id = %course_id,
            "user enrolled in free course"
        );
        Ok(enrollment)
    }
}
