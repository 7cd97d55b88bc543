//! Postgres read-only view of the course catalog.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Course, CourseStatus};
use crate::ports::{CourseCatalog, StoreError, StoreResult};

#[derive(Clone)]
pub struct PostgresCourseCatalog {
    pool: PgPool,
}

impl PostgresCourseCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseCatalog for PostgresCourseCatalog {
    async fn find_published(&self, id: Uuid) -> StoreResult<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT id, title, price, currency, status
            FROM courses
            WHERE id = $1 AND status = 'PUBLISHED'
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        row.map(|r| r.into_domain()).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    price: sqlx::types::BigDecimal,
    currency: String,
    status: String,
}

impl CourseRow {
    fn into_domain(self) -> StoreResult<Course> {
        let status = CourseStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Backend(format!("unknown status '{}'", self.status)))?;

        Ok(Course {
            id: self.id,
            title: self.title,
            price: self.price,
            currency: self.currency,
            status,
        })
    }
}
