//! Posts published by administrators.

use chrono::{NaiveDate, NaiveTime};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::gateway::{
    changeset_error, like_pattern, nullable, require_affected, require_found, Gateway, NoFilter,
};
use crate::pagination::{ListQuery, Page};
use crate::schema::{posts, system_admins};

/// A row in `posts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = posts, check_for_backend(Pg))]
pub struct Post {
    /// Primary key.
    #[diesel(column_name = post_id)]
    pub id: i32,
    /// Headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Author.
    pub admin_id: Option<i32>,
    /// Publication day.
    pub post_date: NaiveDate,
    /// Publication time.
    pub post_time: NaiveTime,
}

/// A post with its author's name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    /// The stored row.
    #[serde(flatten)]
    pub post: Post,
    /// `system_admins.name` of the author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_name: Option<String>,
}

impl From<(Post, Option<String>)> for PostView {
    fn from((post, admin_name): (Post, Option<String>)) -> Self {
        Self { post, admin_name }
    }
}

/// Create payload for [`Post`].
#[derive(Debug, Clone, Deserialize, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost {
    /// Headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Author.
    #[serde(default)]
    pub admin_id: Option<i32>,
    /// Publication day.
    pub post_date: NaiveDate,
    /// Publication time.
    pub post_time: NaiveTime,
}

/// Update payload for [`Post`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = posts)]
pub struct PostChanges {
    /// Headline.
    pub title: Option<String>,
    /// Body text.
    pub content: Option<String>,
    /// Author; `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub admin_id: Option<Option<i32>>,
    /// Publication day.
    pub post_date: Option<NaiveDate>,
    /// Publication time.
    pub post_time: Option<NaiveTime>,
}

/// PostgreSQL gateway for posts.
#[derive(Clone)]
pub struct PostGateway {
    pool: DbPool,
}

impl PostGateway {
    /// Creates a gateway backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

macro_rules! matches_term {
    ($pattern:expr) => {
        posts::title
            .ilike($pattern.clone())
            .or(posts::content.ilike($pattern.clone()))
            .or(system_admins::name
                .nullable()
                .ilike($pattern.clone())
                .assume_not_null())
    };
}

fn fetch(conn: &mut PgConnection, id: i32) -> AppResult<PostView> {
    let row = posts::table
        .left_join(system_admins::table)
        .filter(posts::post_id.eq(id))
        .select((Post::as_select(), system_admins::name.nullable()))
        .first::<(Post, Option<String>)>(conn)
        .optional()?;
    require_found(row.map(PostView::from), PostGateway::NAME, id)
}

impl Gateway for PostGateway {
    type View = PostView;
    type New = NewPost;
    type Changes = PostChanges;
    type Filter = NoFilter;

    const NAME: &'static str = "Post";
    const PLURAL: &'static str = "posts";

    fn list(&self, query: &ListQuery, _filter: &NoFilter) -> AppResult<Page<PostView>> {
        let mut conn = self.pool.get()?;
        let mut rows = posts::table
            .left_join(system_admins::table)
            .select((Post::as_select(), system_admins::name.nullable()))
            .order((posts::post_date.desc(), posts::post_time.desc()))
            .into_boxed();
        let mut total = posts::table
            .left_join(system_admins::table)
            .count()
            .into_boxed();

        if let Some(pattern) = query.search.as_deref().map(like_pattern) {
            rows = rows.filter(matches_term!(pattern));
            total = total.filter(matches_term!(pattern));
        }

        let total = total.get_result::<i64>(&mut conn)?;
        let data = rows
            .limit(query.page.limit)
            .offset(query.page.offset())
            .load::<(Post, Option<String>)>(&mut conn)?
            .into_iter()
            .map(PostView::from)
            .collect();
        Ok(Page::new(data, total, &query.page))
    }

    fn get(&self, id: i32) -> AppResult<PostView> {
        let mut conn = self.pool.get()?;
        fetch(&mut conn, id)
    }

    fn create(&self, new: NewPost) -> AppResult<PostView> {
        let mut conn = self.pool.get()?;
        let id = diesel::insert_into(posts::table)
            .values(&new)
            .returning(posts::post_id)
            .get_result::<i32>(&mut conn)?;
        fetch(&mut conn, id)
    }

    fn update(&self, id: i32, changes: PostChanges) -> AppResult<PostView> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(posts::table.find(id))
            .set(&changes)
            .execute(&mut conn)
            .map_err(changeset_error)?;
        require_affected(updated, Self::NAME, id)?;
        fetch(&mut conn, id)
    }

    fn delete(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(posts::table.find(id)).execute(&mut conn)?;
        require_affected(deleted, Self::NAME, id)
    }
}
