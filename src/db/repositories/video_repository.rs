use super::VideoRepository;
use crate::catalog::pipeline::like_pattern;
use crate::catalog::{CatalogPipeline, Filter, SortDirection, SortField, SortSpec, Stage};
use crate::db::connection::PgStore;
use crate::db::error::RepositoryError;
use crate::db::models::video::{CatalogEntry, NewVideo, OwnerProfile, Video, VideoChanges};
use crate::db::schema::{users, videos};
use diesel::prelude::*;
use uuid::Uuid;

type OwnerColumns = (String, Option<String>, String);
type CatalogRow = (Video, Option<OwnerColumns>);

// Works on any boxed query over `videos`, joined or not, so the listing and
// the count share one translation of each filter.
macro_rules! apply_filter {
    ($query:expr, $filter:expr) => {
        match $filter {
            Filter::Published => $query.filter(videos::is_published.eq(true)),
            // Backslash is PostgreSQL's default LIKE escape character.
            Filter::Text(needle) => {
                let pattern = like_pattern(needle);
                $query.filter(
                    videos::title
                        .ilike(pattern.clone())
                        .or(videos::description.ilike(pattern)),
                )
            }
            Filter::Owner(owner_id) => $query.filter(videos::owner_id.eq(*owner_id)),
        }
    };
}

macro_rules! order_by_direction {
    ($query:expr, $column:expr, $direction:expr) => {
        match $direction {
            SortDirection::Asc => $query.order_by($column.asc()),
            SortDirection::Desc => $query.order_by($column.desc()),
        }
    };
}

macro_rules! apply_sort {
    ($query:expr, $spec:expr) => {{
        let spec: &SortSpec = $spec;
        let query = match spec.field {
            SortField::CreatedAt => order_by_direction!($query, videos::created_at, spec.direction),
            SortField::UpdatedAt => order_by_direction!($query, videos::updated_at, spec.direction),
            SortField::Views => order_by_direction!($query, videos::views, spec.direction),
            SortField::Duration => order_by_direction!($query, videos::duration, spec.direction),
            SortField::Title => order_by_direction!($query, videos::title, spec.direction),
        };
        // Stable pages when the sort key ties.
        query.then_order_by(videos::id.asc())
    }};
}

fn to_sql_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn into_entry((video, owner): CatalogRow) -> CatalogEntry {
    CatalogEntry {
        video,
        owner: owner.map(OwnerProfile::from),
    }
}

impl VideoRepository for PgStore {
    fn create_video(&self, new_video: &NewVideo) -> Result<Video, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::insert_into(videos::table)
            .values(new_video)
            .returning(Video::as_returning())
            .get_result(&mut conn)
            .map_err(Into::into)
    }

    fn find_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError> {
        let mut conn = self.conn()?;

        videos::table
            .filter(videos::id.eq(id))
            .select(Video::as_select())
            .first(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    fn find_video_with_owner(&self, id: Uuid) -> Result<Option<CatalogEntry>, RepositoryError> {
        let mut conn = self.conn()?;

        let row = videos::table
            .left_join(users::table)
            .filter(videos::id.eq(id))
            .select((
                Video::as_select(),
                (users::username, users::avatar, users::full_name).nullable(),
            ))
            .first::<CatalogRow>(&mut conn)
            .optional()?;

        Ok(row.map(into_entry))
    }

    fn aggregate(&self, pipeline: &CatalogPipeline) -> Result<Vec<CatalogEntry>, RepositoryError> {
        let mut conn = self.conn()?;

        let mut query = videos::table
            .left_join(users::table)
            .select((
                Video::as_select(),
                (users::username, users::avatar, users::full_name).nullable(),
            ))
            .into_boxed();

        for stage in pipeline.stages() {
            query = match stage {
                Stage::Match(filter) => apply_filter!(query, filter),
                // The join is part of the base query.
                Stage::JoinOwner => query,
                Stage::Sort(spec) => apply_sort!(query, spec),
                Stage::Skip(count) => query.offset(to_sql_count(*count)),
                Stage::Limit(count) => query.limit(to_sql_count(*count)),
            };
        }

        let rows = query.load::<CatalogRow>(&mut conn)?;
        let joins_owner = pipeline.joins_owner();

        Ok(rows
            .into_iter()
            .map(into_entry)
            .map(|mut entry| {
                if !joins_owner {
                    entry.owner = None;
                }
                entry
            })
            .collect())
    }

    fn count_matching(&self, filters: &[Filter]) -> Result<u64, RepositoryError> {
        let mut conn = self.conn()?;

        let mut query = videos::table.select(diesel::dsl::count_star()).into_boxed();
        for filter in filters {
            query = apply_filter!(query, filter);
        }

        let total: i64 = query.get_result(&mut conn)?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    fn increment_views(&self, id: Uuid) -> Result<Option<i64>, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::update(videos::table.filter(videos::id.eq(id)))
            .set(videos::views.eq(videos::views + 1))
            .returning(videos::views)
            .get_result::<i64>(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: &VideoChanges,
    ) -> Result<Option<Video>, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::update(
            videos::table
                .filter(videos::id.eq(id))
                .filter(videos::owner_id.eq(owner_id)),
        )
        .set(changes)
        .returning(Video::as_returning())
        .get_result(&mut conn)
        .optional()
        .map_err(Into::into)
    }

    fn toggle_publish_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Video>, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::update(
            videos::table
                .filter(videos::id.eq(id))
                .filter(videos::owner_id.eq(owner_id)),
        )
        .set(videos::is_published.eq(diesel::dsl::not(videos::is_published)))
        .returning(Video::as_returning())
        .get_result(&mut conn)
        .optional()
        .map_err(Into::into)
    }

    fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Video>, RepositoryError> {
        let mut conn = self.conn()?;

        diesel::delete(
            videos::table
                .filter(videos::id.eq(id))
                .filter(videos::owner_id.eq(owner_id)),
        )
        .returning(Video::as_returning())
        .get_result(&mut conn)
        .optional()
        .map_err(Into::into)
    }
}
