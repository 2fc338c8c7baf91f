use super::UserRepository;
use crate::db::connection::PgStore;
use crate::db::error::RepositoryError;
use crate::db::models::user::{AccountChanges, NewUser, User};
use crate::db::schema::users;
use diesel::prelude::*;
use uuid::Uuid;

impl UserRepository for PgStore {
    fn create_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::insert_into(users::table)
            .values(new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    fn find_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.conn()?;

        users::table
            .filter(users::id.eq(id))
            .select(User::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.conn()?;

        users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.conn()?;

        users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    fn update_password(&self, id: Uuid, password_hash: &str) -> Result<User, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::update(users::table.filter(users::id.eq(id)))
            .set(users::password_hash.eq(password_hash))
            .returning(User::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    fn update_account(&self, id: Uuid, changes: &AccountChanges) -> Result<User, RepositoryError> {
        // An empty changeset is a diesel error; read the row instead.
        if changes.is_empty() {
            return self
                .find_user(id)?
                .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")));
        }

        let mut conn = self.conn()?;

        diesel::update(users::table.filter(users::id.eq(id)))
            .set(changes)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }
}
