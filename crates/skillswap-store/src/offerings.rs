//! [`SkillOffering`] storage: one row per (user, skill), replaced on re-add.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::SkillOffering;
use crate::row;

impl Database {
    /// Create or replace the user's offering for a skill.
    pub fn upsert_offering(
        &self,
        user_id: Uuid,
        skill_id: Uuid,
        skill_level: &str,
        hourly_rate: i64,
        description: &str,
    ) -> Result<SkillOffering> {
        let id = Uuid::new_v4();

        self.conn().execute(
            "INSERT OR REPLACE INTO skill_offerings
                 (id, user_id, skill_id, skill_level, hourly_rate, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                user_id.to_string(),
                skill_id.to_string(),
                skill_level,
                hourly_rate,
                description,
            ],
        )?;

        self.get_offering(id)
    }

    /// Fetch a single offering with its catalog entry joined in.
    pub fn get_offering(&self, id: Uuid) -> Result<SkillOffering> {
        self.conn()
            .query_row(
                "SELECT so.id, so.user_id, so.skill_id, so.skill_level, so.hourly_rate,
                        so.description, s.name, s.category
                 FROM skill_offerings so
                 JOIN skills s ON so.skill_id = s.id
                 WHERE so.id = ?1",
                params![id.to_string()],
                row_to_offering,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// All offerings by one user.
    pub fn offerings_for_user(&self, user_id: Uuid) -> Result<Vec<SkillOffering>> {
        let mut stmt = self.conn().prepare(
            "SELECT so.id, so.user_id, so.skill_id, so.skill_level, so.hourly_rate,
                    so.description, s.name, s.category
             FROM skill_offerings so
             JOIN skills s ON so.skill_id = s.id
             WHERE so.user_id = ?1
             ORDER BY s.name ASC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], row_to_offering)?;

        let mut offerings = Vec::new();
        for row in rows {
            offerings.push(row?);
        }
        Ok(offerings)
    }
}

fn row_to_offering(row: &rusqlite::Row<'_>) -> rusqlite::Result<SkillOffering> {
    Ok(SkillOffering {
        id: row::col_uuid(row, 0)?,
        user_id: row::col_uuid(row, 1)?,
        skill_id: row::col_uuid(row, 2)?,
        skill_level: row.get(3)?,
        hourly_rate: row.get(4)?,
        description: row.get(5)?,
        skill_name: row.get(6)?,
        category: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_user, test_db};

    #[test]
    fn re_adding_replaces_the_previous_offering() {
        let db = test_db();
        let alice = db.create_user(&new_user("a@example.com")).unwrap();
        let guitar = db.create_skill("Guitar", "Music", "Intermediate", 30).unwrap();

        db.upsert_offering(alice.id, guitar.id, "Beginner", 20, "first steps")
            .unwrap();
        db.upsert_offering(alice.id, guitar.id, "Advanced", 45, "fingerstyle")
            .unwrap();

        let offerings = db.offerings_for_user(alice.id).unwrap();
        assert_eq!(offerings.len(), 1);
        assert_eq!(offerings[0].skill_level, "Advanced");
        assert_eq!(offerings[0].hourly_rate, 45);
        assert_eq!(offerings[0].skill_name, "Guitar");
    }

    #[test]
    fn offerings_for_other_users_not_returned() {
        let db = test_db();
        let alice = db.create_user(&new_user("a@example.com")).unwrap();
        let bob = db.create_user(&new_user("b@example.com")).unwrap();
        let yoga = db.create_skill("Yoga", "Fitness", "Beginner", 25).unwrap();

        db.upsert_offering(bob.id, yoga.id, "Expert", 35, "").unwrap();

        assert!(db.offerings_for_user(alice.id).unwrap().is_empty());
    }
}
