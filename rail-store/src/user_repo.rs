use async_trait::async_trait;
use rail_core::repository::{RepoResult, UserDirectory};
use rail_shared::User;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    role: String,
}

impl UserRow {
    fn into_user(self) -> RepoResult<User> {
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role.parse()?,
        })
    }
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT id, name, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(UserRow::into_user)
            .transpose()
    }

    async fn upsert_user(&self, user: &User) -> RepoResult<User> {
        sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, email = EXCLUDED.email, role = EXCLUDED.role, updated_at = NOW()
            RETURNING id, name, email, role
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?
        .into_user()
    }
}
