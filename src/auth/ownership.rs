use uuid::Uuid;

use super::extractors::Identity;
use crate::db::models::video::Video;
use crate::error::AppError;

pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Video {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Missing resource is `NotFound`; anyone but the owner, anonymous
/// callers included, is `Forbidden`.
pub fn assert_owner<'a, R: Owned>(
    resource: Option<&'a R>,
    identity: Option<&Identity>,
) -> Result<&'a R, AppError> {
    let resource = resource.ok_or_else(|| AppError::not_found("Video not found"))?;

    match identity {
        Some(identity) if identity.user_id == resource.owner_id() => Ok(resource),
        _ => Err(AppError::forbidden("You are not the owner of this video")),
    }
}
