use crate::db::schema::users;
use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use uuid::Uuid;
use vidhub_api::UserResponse;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub avatar_key: Option<String>,
    pub cover_image_key: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            created_at: user.created_at,
        }
    }
}

/// Profile fields a user may change; `None` leaves the column untouched.
/// Image keys travel with their URLs so the replaced object can be removed.
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = users)]
pub struct AccountChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub avatar_key: Option<String>,
    pub cover_image_key: Option<String>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.avatar.is_none()
            && self.cover_image.is_none()
            && self.avatar_key.is_none()
            && self.cover_image_key.is_none()
    }
}
