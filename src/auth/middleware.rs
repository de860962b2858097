use actix_session::SessionExt;
use actix_web::{
    Error, ResponseError,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
};

use crate::auth::session::require_user;

/// Middleware function that checks for an authenticated session.
/// Answers 401 with a JSON error body when no user is signed in, and 500 when
/// the session cookie is unreadable.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let session = req.get_session();
    if let Err(e) = require_user(&session) {
        return Ok(req.into_response(e.error_response()).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
