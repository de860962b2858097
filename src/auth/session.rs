use actix_session::Session;

use crate::errors::AppError;

/// The signed-in manager. Sessions are issued by the host application; this
/// crate only reads `user_id`. A cookie that cannot be decoded is an error
/// rather than an anonymous request.
pub fn require_user(session: &Session) -> Result<i64, AppError> {
    match session.get::<i64>("user_id") {
        Ok(Some(user_id)) => Ok(user_id),
        Ok(None) => Err(AppError::Unauthorized),
        Err(e) => Err(AppError::Session(e.to_string())),
    }
}
