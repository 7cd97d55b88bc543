use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::ports::AuthUser;
use crate::AppState;

/// Synchronous enrollment path for free courses. Priced courses answer 402
/// and point the client at the payment flow.
pub async fn enroll(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let enrollment = state.enrollments.enroll_free(user.id, course_id).await?;
    Ok(Json(enrollment))
}
