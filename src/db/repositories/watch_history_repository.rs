use super::WatchHistoryRepository;
use crate::db::connection::PgStore;
use crate::db::error::RepositoryError;
use crate::db::schema::watch_history;
use diesel::prelude::*;
use uuid::Uuid;

impl WatchHistoryRepository for PgStore {
    fn record_view(&self, user_id: Uuid, video_id: Uuid) -> Result<(), RepositoryError> {
        let mut conn = self.conn()?;

        diesel::insert_into(watch_history::table)
            .values((
                watch_history::user_id.eq(user_id),
                watch_history::video_id.eq(video_id),
            ))
            .on_conflict_do_nothing()
            .execute(&mut conn)?;

        Ok(())
    }

    fn watched_video_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        let mut conn = self.conn()?;

        watch_history::table
            .filter(watch_history::user_id.eq(user_id))
            .order(watch_history::watched_at.asc())
            .select(watch_history::video_id)
            .load(&mut conn)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_support::store;
    use crate::db::repositories::user_repository::test_support::{delete_user, new_user};
    use crate::db::repositories::video_repository::test_support::new_video;
    use crate::db::repositories::{UserRepository, VideoRepository};

    #[test]
    #[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
    fn repeated_views_are_recorded_once() {
        let store = store();
        let user = store.create_user(&new_user("history")).unwrap();
        let video = store.create_video(&new_video(user.id, "again", true)).unwrap();

        store.record_view(user.id, video.id).unwrap();
        store.record_view(user.id, video.id).unwrap();

        assert_eq!(store.watched_video_ids(user.id).unwrap(), vec![video.id]);

        delete_user(&store, user.id);
    }
}
