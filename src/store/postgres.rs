use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use super::models::*;
use super::{Datastore, StoreError};

/// Idempotent schema, applied at startup. Uniqueness that the business
/// rules only check advisorily (email, one like per idea/user pair) is
/// backed by real constraints here so a lost check-then-write race surfaces
/// as a constraint violation instead of corrupt state.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,
    password    TEXT NOT NULL,
    role_id     BIGINT NOT NULL REFERENCES roles(id),
    profile_img TEXT NOT NULL DEFAULT '',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT users_email_key UNIQUE (email)
);

CREATE TABLE IF NOT EXISTS tags (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    CONSTRAINT tags_name_key UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS ideas (
    id          BIGSERIAL PRIMARY KEY,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    user_id     BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS idea_tags (
    idea_id     BIGINT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
    tag_id      BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    CONSTRAINT idea_tags_pkey PRIMARY KEY (idea_id, tag_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id          BIGSERIAL PRIMARY KEY,
    content     TEXT NOT NULL,
    idea_id     BIGINT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
    user_id     BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS likes (
    id          BIGSERIAL PRIMARY KEY,
    idea_id     BIGINT NOT NULL REFERENCES ideas(id) ON DELETE CASCADE,
    user_id     BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT likes_idea_id_user_id_key UNIQUE (idea_id, user_id)
);

CREATE TABLE IF NOT EXISTS tag_subscriptions (
    tag_id      BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    user_id     BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    CONSTRAINT tag_subscriptions_pkey PRIMARY KEY (tag_id, user_id)
);
"#;

/// sqlx-backed datastore.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema. Safe to run on every startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        self.pool.execute(SCHEMA).await?;
        info!("database schema is up to date");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Translate Postgres constraint failures into the signals entity clients
/// key their business rules on.
fn map_db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        let constraint = db.constraint().unwrap_or("unknown").to_string();
        match db.code().as_deref() {
            Some("23505") => return StoreError::UniqueViolation(constraint),
            Some("23503") => return StoreError::ForeignKeyViolation(constraint),
            _ => {}
        }
    }
    StoreError::Sqlx(err)
}

#[async_trait]
impl Datastore for PgStore {
    // --- roles ---

    async fn role(&self, id: i64) -> Result<Option<Role>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM roles ORDER BY id").fetch_all(&self.pool).await?)
    }

    async fn insert_role(&self, name: &str) -> Result<Role, StoreError> {
        Ok(sqlx::query_as("INSERT INTO roles (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_role(&self, id: i64, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(sqlx::query_as("UPDATE roles SET name = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_role(&self, id: i64) -> Result<Option<Role>, StoreError> {
        sqlx::query_as("DELETE FROM roles WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn users_for_role(&self, role_id: i64) -> Result<Vec<User>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE role_id = $1 ORDER BY id")
            .bind(role_id)
            .fetch_all(&self.pool)
            .await?)
    }

    // --- users ---

    async fn user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM users ORDER BY id").fetch_all(&self.pool).await?)
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        sqlx::query_as(
            "INSERT INTO users (name, email, password, role_id, profile_img)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password)
        .bind(new.role_id)
        .bind(&new.profile_img)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        sqlx::query_as(
            "UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                password = COALESCE($4, password),
                role_id = COALESCE($5, role_id),
                profile_img = COALESCE($6, profile_img),
                updated_at = now()
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.password)
        .bind(patch.role_id)
        .bind(patch.profile_img)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn delete_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as("DELETE FROM users WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- tags ---

    async fn tag(&self, id: i64) -> Result<Option<Tag>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn tag_by_name(&self, name: &str) -> Result<Option<Tag>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM tags WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn tags(&self) -> Result<Vec<Tag>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM tags ORDER BY id").fetch_all(&self.pool).await?)
    }

    async fn tags_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(sqlx::query_as("SELECT * FROM tags WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_tag(&self, new: NewTag) -> Result<Tag, StoreError> {
        sqlx::query_as("INSERT INTO tags (name, description) VALUES ($1, $2) RETURNING *")
            .bind(&new.name)
            .bind(&new.description)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn update_tag(&self, id: i64, patch: TagPatch) -> Result<Option<Tag>, StoreError> {
        sqlx::query_as(
            "UPDATE tags SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn delete_tag(&self, id: i64) -> Result<Option<Tag>, StoreError> {
        Ok(sqlx::query_as("DELETE FROM tags WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- tag subscriptions ---

    async fn insert_subscription(&self, tag_id: i64, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO tag_subscriptions (tag_id, user_id) VALUES ($1, $2)")
            .bind(tag_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn delete_subscription(&self, tag_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM tag_subscriptions WHERE tag_id = $1 AND user_id = $2")
                .bind(tag_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn subscribers(&self, tag_id: i64) -> Result<Vec<User>, StoreError> {
        Ok(sqlx::query_as(
            "SELECT u.* FROM users u
             JOIN tag_subscriptions s ON s.user_id = u.id
             WHERE s.tag_id = $1 ORDER BY u.id",
        )
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // --- ideas ---

    async fn idea(&self, id: i64) -> Result<Option<Idea>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM ideas WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn ideas(&self, query: IdeaQuery) -> Result<Vec<Idea>, StoreError> {
        let mut sql = String::from("SELECT i.* FROM ideas i");
        if !query.tag_ids.is_empty() {
            sql.push_str(" WHERE i.id IN (SELECT idea_id FROM idea_tags WHERE tag_id = ANY($1))");
        }
        let dir = match query.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        match query.sort {
            Some(IdeaSort::Likes) => sql.push_str(&format!(
                " ORDER BY (SELECT COUNT(*) FROM likes l WHERE l.idea_id = i.id) {dir}, i.id"
            )),
            Some(IdeaSort::Comments) => sql.push_str(&format!(
                " ORDER BY (SELECT COUNT(*) FROM comments c WHERE c.idea_id = i.id) {dir}, i.id"
            )),
            Some(IdeaSort::Date) => sql.push_str(&format!(" ORDER BY i.created_at {dir}, i.id")),
            None => sql.push_str(" ORDER BY i.id"),
        }
        sql.push_str(&format!(
            " LIMIT {} OFFSET {}",
            query.per_page,
            query.page.max(0).saturating_mul(query.per_page)
        ));

        let rows = if query.tag_ids.is_empty() {
            sqlx::query_as(&sql).fetch_all(&self.pool).await?
        } else {
            sqlx::query_as(&sql).bind(&query.tag_ids).fetch_all(&self.pool).await?
        };
        Ok(rows)
    }

    async fn ideas_for_user(&self, user_id: i64) -> Result<Vec<Idea>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM ideas WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_idea(&self, new: NewIdea) -> Result<Idea, StoreError> {
        sqlx::query_as(
            "INSERT INTO ideas (title, content, user_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&new.title)
        .bind(&new.content)
        .bind(new.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn update_idea(&self, id: i64, patch: IdeaPatch) -> Result<Option<Idea>, StoreError> {
        Ok(sqlx::query_as(
            "UPDATE ideas SET title = $2, content = $3, updated_at = now()
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.content)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_idea(&self, id: i64) -> Result<Option<Idea>, StoreError> {
        Ok(sqlx::query_as("DELETE FROM ideas WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- idea <-> tag associations ---

    async fn idea_tags(&self, idea_id: i64) -> Result<Vec<Tag>, StoreError> {
        Ok(sqlx::query_as(
            "SELECT t.* FROM tags t
             JOIN idea_tags it ON it.tag_id = t.id
             WHERE it.idea_id = $1 ORDER BY t.id",
        )
        .bind(idea_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn link_idea_tags(&self, idea_id: i64, tag_ids: &[i64]) -> Result<(), StoreError> {
        if tag_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO idea_tags (idea_id, tag_id)
             SELECT $1, unnest($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(idea_id)
        .bind(tag_ids)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn relink_idea_tags(&self, idea_id: i64, tag_ids: &[i64]) -> Result<bool, StoreError> {
        // One transaction closes the clear/recreate window against
        // concurrent updates to the same idea.
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM ideas WHERE id = $1 FOR UPDATE")
                .bind(idea_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM idea_tags WHERE idea_id = $1")
            .bind(idea_id)
            .execute(&mut *tx)
            .await?;
        if !tag_ids.is_empty() {
            sqlx::query(
                "INSERT INTO idea_tags (idea_id, tag_id) SELECT $1, unnest($2::bigint[])",
            )
            .bind(idea_id)
            .bind(tag_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        }

        tx.commit().await?;
        Ok(true)
    }

    // --- comments ---

    async fn comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn comments(&self) -> Result<Vec<Comment>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM comments ORDER BY id").fetch_all(&self.pool).await?)
    }

    async fn comments_for_idea(&self, idea_id: i64) -> Result<Vec<Comment>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM comments WHERE idea_id = $1 ORDER BY id")
            .bind(idea_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn comments_for_user(&self, user_id: i64) -> Result<Vec<Comment>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM comments WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        sqlx::query_as(
            "INSERT INTO comments (content, idea_id, user_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&new.content)
        .bind(new.idea_id)
        .bind(new.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<Option<Comment>, StoreError> {
        Ok(sqlx::query_as(
            "UPDATE comments SET content = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        Ok(sqlx::query_as("DELETE FROM comments WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- likes ---

    async fn like(&self, id: i64) -> Result<Option<Like>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM likes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn likes(&self) -> Result<Vec<Like>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM likes ORDER BY id").fetch_all(&self.pool).await?)
    }

    async fn likes_for_idea(&self, idea_id: i64) -> Result<Vec<Like>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM likes WHERE idea_id = $1 ORDER BY id")
            .bind(idea_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn likes_for_user(&self, user_id: i64) -> Result<Vec<Like>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM likes WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_like(&self, idea_id: i64, user_id: i64) -> Result<Like, StoreError> {
        sqlx::query_as("INSERT INTO likes (idea_id, user_id) VALUES ($1, $2) RETURNING *")
            .bind(idea_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn delete_like(&self, id: i64) -> Result<Option<Like>, StoreError> {
        Ok(sqlx::query_as("DELETE FROM likes WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_like_by_pair(
        &self,
        idea_id: i64,
        user_id: i64,
    ) -> Result<Option<Like>, StoreError> {
        Ok(sqlx::query_as(
            "DELETE FROM likes WHERE idea_id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(idea_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
