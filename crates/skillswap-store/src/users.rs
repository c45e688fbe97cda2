//! CRUD operations for [`User`] records.
//!
//! `points_balance` is deliberately absent from every update here; the only
//! writers of that column live in [`crate::ledger`].

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{NewUser, ProfileUpdate, User, UserProfile};
use crate::row;

/// Filters for the user search endpoint. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct UserSearchFilters {
    /// Matches name, bio, or an offered skill's name.
    pub search: Option<String>,
    pub location: Option<String>,
    pub skill: Option<String>,
    pub min_rating: Option<f64>,
    pub limit: u32,
    pub offset: u32,
}

const USER_COLUMNS: &str = "id, public_id, name, email, password_hash, location, bio, \
     points_balance, average_rating, created_at, updated_at";

impl Database {
    /// Insert a new user with a zero balance and return the stored row.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn().execute(
            "INSERT INTO users (id, public_id, name, email, password_hash, location, bio,
                                points_balance, average_rating, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8, ?8)",
            params![
                id.to_string(),
                new.public_id,
                new.name,
                new.email,
                new.password_hash,
                new.location,
                new.bio,
                now,
            ],
        )?;

        self.get_user(id)
    }

    /// Fetch a single user by UUID.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Look up a user by email. Returns `None` when no account matches.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let result = self.conn().query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            row_to_user,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Apply a partial profile edit. Absent fields keep their value.
    pub fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();
        let affected = self.conn().execute(
            "UPDATE users
             SET name = COALESCE(?2, name),
                 location = COALESCE(?3, location),
                 bio = COALESCE(?4, bio),
                 updated_at = ?5
             WHERE id = ?1",
            params![id.to_string(), update.name, update.location, update.bio, now],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }

    /// Write a freshly aggregated average rating.
    pub fn set_average_rating(&self, id: Uuid, average: f64) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET average_rating = ?2 WHERE id = ?1",
            params![id.to_string(), average],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Search users by free text and filters, best rated first.
    pub fn search_users(&self, filters: &UserSearchFilters) -> Result<Vec<UserProfile>> {
        let mut sql = String::from(
            "SELECT DISTINCT u.id, u.public_id, u.name, u.email, u.location, u.bio,
                    u.points_balance, u.average_rating, u.created_at
             FROM users u
             LEFT JOIN skill_offerings so ON u.id = so.user_id
             LEFT JOIN skills s ON so.skill_id = s.id
             WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(term) = &filters.search {
            sql.push_str(&format!(
                " AND (u.name LIKE ?{n} OR u.bio LIKE ?{n} OR s.name LIKE ?{n})",
                n = args.len() + 1
            ));
            args.push(Box::new(format!("%{term}%")));
        }
        if let Some(location) = &filters.location {
            sql.push_str(&format!(" AND u.location LIKE ?{}", args.len() + 1));
            args.push(Box::new(format!("%{location}%")));
        }
        if let Some(skill) = &filters.skill {
            sql.push_str(&format!(" AND s.name LIKE ?{}", args.len() + 1));
            args.push(Box::new(format!("%{skill}%")));
        }
        if let Some(min_rating) = filters.min_rating {
            sql.push_str(&format!(" AND u.average_rating >= ?{}", args.len() + 1));
            args.push(Box::new(min_rating));
        }

        sql.push_str(&format!(
            " ORDER BY u.average_rating DESC, u.created_at DESC LIMIT ?{} OFFSET ?{}",
            args.len() + 1,
            args.len() + 2
        ));
        args.push(Box::new(filters.limit.max(1)));
        args.push(Box::new(filters.offset));

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            row_to_profile,
        )?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row::col_uuid(row, 0)?,
        public_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        location: row.get(5)?,
        bio: row.get(6)?,
        points_balance: row.get(7)?,
        average_rating: row.get(8)?,
        created_at: row::col_ts(row, 9)?,
        updated_at: row::col_ts(row, 10)?,
    })
}

/// Map a projection without credential columns to a [`UserProfile`].
fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row::col_uuid(row, 0)?,
        public_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        location: row.get(4)?,
        bio: row.get(5)?,
        points_balance: row.get(6)?,
        average_rating: row.get(7)?,
        created_at: row::col_ts(row, 8)?,
    })
}
