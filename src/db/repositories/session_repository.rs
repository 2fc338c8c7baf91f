use super::SessionRepository;
use crate::db::connection::PgStore;
use crate::db::error::RepositoryError;
use crate::db::models::session::{NewSession, Session};
use crate::db::schema::sessions;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

impl SessionRepository for PgStore {
    fn create_session(&self, new_session: &NewSession) -> Result<Session, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::insert_into(sessions::table)
            .values(new_session)
            .returning(Session::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    fn find_session(&self, id: Uuid) -> Result<Option<Session>, RepositoryError> {
        let mut conn = self.conn()?;

        sessions::table
            .filter(sessions::id.eq(id))
            .select(Session::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    fn replace_token(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.conn()?;

        let updated = diesel::update(
            sessions::table
                .filter(sessions::id.eq(id))
                .filter(sessions::token_hash.eq(expected_hash)),
        )
        .set((
            sessions::token_hash.eq(new_hash),
            sessions::expires_at.eq(expires_at),
        ))
        .execute(&mut conn)?;

        Ok(updated == 1)
    }

    fn delete_other_sessions(&self, user_id: Uuid, keep: Uuid) -> Result<usize, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::delete(
            sessions::table
                .filter(sessions::user_id.eq(user_id))
                .filter(sessions::id.ne(keep)),
        )
        .execute(&mut conn)
        .map_err(Into::into)
    }

    fn delete_user_sessions(&self, user_id: Uuid) -> Result<usize, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::delete(sessions::table.filter(sessions::user_id.eq(user_id)))
            .execute(&mut conn)
            .map_err(Into::into)
    }
}
