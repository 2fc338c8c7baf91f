//! Typed catalog pipeline.
//!
//! A listing request becomes an ordered list of [`Stage`]s. Stores execute
//! the list in order: the in-memory store folds [`Stage::apply`] over its
//! rows, the PostgreSQL store translates each stage into one clause of a
//! boxed diesel query.

use std::cmp::Ordering;

use uuid::Uuid;

use super::request::{CatalogRequest, Pagination};
use crate::db::models::video::{CatalogEntry, OwnerProfile, Video};

/// Row predicate of a `Match` stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Published,
    /// Case-insensitive literal substring of title or description.
    Text(String),
    Owner(Uuid),
}

impl Filter {
    /// Blank input yields no filter.
    pub fn text(needle: &str) -> Option<Self> {
        let needle = needle.trim();
        (!needle.is_empty()).then(|| Filter::Text(needle.to_string()))
    }

    pub fn matches(&self, video: &Video) -> bool {
        match self {
            Filter::Published => video.is_published,
            Filter::Text(needle) => {
                let needle = needle.to_lowercase();
                video.title.to_lowercase().contains(&needle)
                    || video.description.to_lowercase().contains(&needle)
            }
            Filter::Owner(owner_id) => video.owner_id == *owner_id,
        }
    }
}

/// `ILIKE` pattern matching `needle` anywhere, with `\`, `%` and `_` escaped.
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Views,
    Duration,
    Title,
}

impl SortField {
    /// Field names as clients send them; anything else is unrecognized.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            "views" => Some(Self::Views),
            "duration" => Some(Self::Duration),
            "title" => Some(Self::Title),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` (any case) sorts descending, every other value ascending.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::newest_first()
    }
}

impl SortSpec {
    pub fn newest_first() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }

    /// Honors the request only when both parts are present and the field is known.
    pub fn from_request(sort_by: Option<&str>, sort_type: Option<&str>) -> Self {
        match (sort_by.and_then(SortField::parse), sort_type) {
            (Some(field), Some(direction)) => Self {
                field,
                direction: SortDirection::parse(direction),
            },
            _ => Self::newest_first(),
        }
    }

    pub fn compare(&self, a: &Video, b: &Video) -> Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Views => a.views.cmp(&b.views),
            SortField::Duration => a.duration.total_cmp(&b.duration),
            SortField::Title => a.title.cmp(&b.title),
        };
        let ordering = match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        // Ties go by id, ascending, like the SQL query.
        ordering.then_with(|| a.id.cmp(&b.id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    JoinOwner,
    Sort(SortSpec),
    Skip(u64),
    Limit(u64),
}

impl Stage {
    pub fn apply(
        &self,
        mut rows: Vec<CatalogEntry>,
        owner_of: &dyn Fn(Uuid) -> Option<OwnerProfile>,
    ) -> Vec<CatalogEntry> {
        match self {
            Stage::Match(filter) => {
                rows.retain(|row| filter.matches(&row.video));
                rows
            }
            Stage::JoinOwner => {
                for row in &mut rows {
                    row.owner = owner_of(row.video.owner_id);
                }
                rows
            }
            Stage::Sort(spec) => {
                rows.sort_by(|a, b| spec.compare(&a.video, &b.video));
                rows
            }
            Stage::Skip(count) => rows.into_iter().skip(to_usize(*count)).collect(),
            Stage::Limit(count) => {
                rows.truncate(to_usize(*count));
                rows
            }
        }
    }
}

fn to_usize(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// Ordered stage list for one catalog query.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPipeline {
    stages: Vec<Stage>,
}

impl CatalogPipeline {
    /// Public listing: published only, optional text and owner filters,
    /// owner join, requested sort, page window.
    pub fn public(request: &CatalogRequest) -> Self {
        let mut stages = vec![Stage::Match(Filter::Published)];
        if let Some(text) = request.text.as_deref().and_then(Filter::text) {
            stages.push(Stage::Match(text));
        }
        if let Some(owner_id) = request.owner {
            stages.push(Stage::Match(Filter::Owner(owner_id)));
        }
        stages.push(Stage::JoinOwner);
        stages.push(Stage::Sort(request.sort));
        Self::windowed(stages, request.pagination)
    }

    /// Everything one user owns, published or not, newest first.
    pub fn owned_by(owner_id: Uuid, pagination: Pagination) -> Self {
        let stages = vec![
            Stage::Match(Filter::Owner(owner_id)),
            Stage::Sort(SortSpec::newest_first()),
        ];
        Self::windowed(stages, pagination)
    }

    fn windowed(mut stages: Vec<Stage>, pagination: Pagination) -> Self {
        stages.push(Stage::Skip(pagination.skip()));
        stages.push(Stage::Limit(u64::from(pagination.limit())));
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Filters of the `Match` stages; the total count is computed over these only.
    pub fn match_filters(&self) -> Vec<Filter> {
        self.stages
            .iter()
            .filter_map(|stage| match stage {
                Stage::Match(filter) => Some(filter.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn joins_owner(&self) -> bool {
        self.stages.contains(&Stage::JoinOwner)
    }

    pub fn run(
        &self,
        rows: Vec<CatalogEntry>,
        owner_of: &dyn Fn(Uuid) -> Option<OwnerProfile>,
    ) -> Vec<CatalogEntry> {
        self.stages
            .iter()
            .fold(rows, |rows, stage| stage.apply(rows, owner_of))
    }
}
