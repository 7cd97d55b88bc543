//! Postgres implementation of the enrollment store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Enrollment, EnrollmentStatus};
use crate::ports::{EnrollmentStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct PostgresEnrollmentStore {
    pool: PgPool,
}

impl PostgresEnrollmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentStore for PostgresEnrollmentStore {
    async fn find_current(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> StoreResult<Option<Enrollment>> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT * FROM enrollments
            WHERE user_id = $1 AND course_id = $2 AND status IN ('ACTIVE', 'COMPLETED')
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        row.map(|r| r.into_domain()).transpose()
    }

    async fn insert_or_get(&self, enrollment: &Enrollment) -> StoreResult<Enrollment> {
        // The partial unique index on (user_id, course_id) arbitrates
        // concurrent inserts; the loser falls through to the existing row.
        let inserted = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            INSERT INTO enrollments (id, user_id, course_id, status, enrolled_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, course_id) WHERE status IN ('ACTIVE', 'COMPLETED')
            DO NOTHING
            RETURNING id, user_id, course_id, status, enrolled_at, completed_at
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .bind(enrollment.status.as_str())
        .bind(enrollment.enrolled_at)
        .bind(enrollment.completed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        if let Some(row) = inserted {
            return row.into_domain();
        }

        self.find_current(enrollment.user_id, enrollment.course_id)
            .await?
            .ok_or_else(|| {
                StoreError::Backend("enrollment upsert conflicted but no current row found".into())
            })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EnrollmentRow {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    status: String,
    enrolled_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl EnrollmentRow {
    fn into_domain(self) -> StoreResult<Enrollment> {
        let status = EnrollmentStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Backend(format!("unknown status '{}'", self.status)))?;

        Ok(Enrollment {
            id: self.id,
            user_id: self.user_id,
            course_id: self.course_id,
            status,
            enrolled_at: self.enrolled_at,
            completed_at: self.completed_at,
        })
    }
}
