use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// Sanitized user record, safe to return to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Full credential row. Never serialized.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
    pub refresh_token: Option<String>,
}

/// Input for creating a user. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: String,
    pub password_hash: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    uuid: String,
    username: String,
    email: String,
    fullname: String,
    avatar: String,
    cover_image: String,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            username: row.username,
            email: row.email,
            fullname: row.fullname,
            avatar: row.avatar,
            cover_image: row.cover_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRecordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
    refresh_token: Option<String>,
}

impl From<UserRecordRow> for UserRecord {
    fn from(row: UserRecordRow) -> Self {
        Self {
            user: row.user.into(),
            password_hash: row.password_hash,
            refresh_token: row.refresh_token,
        }
    }
}

const USER_COLUMNS: &str =
    "id, uuid, username, email, fullname, avatar, cover_image, created_at, updated_at";

const RECORD_COLUMNS: &str = "id, uuid, username, email, fullname, avatar, cover_image, created_at, updated_at, password_hash, refresh_token";

/// Whether a database error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user ID.
    pub async fn create(&self, input: &NewUser) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, username, email, fullname, avatar, cover_image, password_hash) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.uuid)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.fullname)
        .bind(&input.avatar)
        .bind(&input.cover_image)
        .bind(&input.password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE uuid = ?", USER_COLUMNS))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get the full credential row by ID.
    pub async fn get_record_by_id(&self, id: i64) -> Result<Option<UserRecord>, sqlx::Error> {
        let row: Option<UserRecordRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", RECORD_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(UserRecord::from))
    }

    /// Get the full credential row by UUID.
    pub async fn get_record_by_uuid(&self, uuid: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        let row: Option<UserRecordRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE uuid = ?", RECORD_COLUMNS))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(UserRecord::from))
    }

    /// Find a user whose username or email matches. A `None` side never matches.
    pub async fn find_by_identifier(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        if username.is_none() && email.is_none() {
            return Ok(None);
        }

        let row: Option<UserRecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE username = ? OR email = ? ORDER BY id LIMIT 1",
            RECORD_COLUMNS
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserRecord::from))
    }

    /// Check whether the username or the email is already taken.
    pub async fn exists_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Overwrite the refresh token slot. `None` clears it.
    ///
    /// Single-column write, nothing else about the row is re-validated.
    /// Returns false if no such user exists.
    pub async fn update_refresh_token(
        &self,
        id: i64,
        token: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the password hash.
    pub async fn update_password_hash(
        &self,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update the account details.
    pub async fn update_account(
        &self,
        id: i64,
        fullname: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET fullname = ?, email = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(fullname)
        .bind(email)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_avatar(&self, id: i64, url: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET avatar = ?, updated_at = datetime('now') WHERE id = ?")
                .bind(url)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_cover_image(&self, id: i64, url: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET cover_image = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(url)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
