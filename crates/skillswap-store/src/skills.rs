//! Skill catalog queries and the teacher search.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Skill, TeacherMatch, UserProfile};
use crate::row;

/// Filters for the teacher search. All fields optional.
#[derive(Debug, Clone, Default)]
pub struct TeacherSearchFilters {
    pub skill: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub skill_level: Option<String>,
    pub min_rating: Option<f64>,
    pub max_hourly_rate: Option<i64>,
    pub limit: u32,
    pub offset: u32,
}

impl Database {
    /// Insert a catalog entry. The slug is derived from the name with a
    /// random suffix so re-adding the same name never collides.
    pub fn create_skill(
        &self,
        name: &str,
        category: &str,
        skill_level: &str,
        hourly_rate: i64,
    ) -> Result<Skill> {
        let id = Uuid::new_v4();
        let slug = format!(
            "{}-{}",
            name.to_lowercase().replace(char::is_whitespace, "-"),
            &id.simple().to_string()[..8]
        );

        self.conn().execute(
            "INSERT INTO skills (id, slug, name, category, skill_level, hourly_rate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id.to_string(), slug, name, category, skill_level, hourly_rate],
        )?;

        Ok(Skill {
            id,
            slug,
            name: name.to_string(),
            category: category.to_string(),
            skill_level: skill_level.to_string(),
            hourly_rate,
        })
    }

    /// Fetch a single catalog entry.
    pub fn get_skill(&self, id: Uuid) -> Result<Skill> {
        self.conn()
            .query_row(
                "SELECT id, slug, name, category, skill_level, hourly_rate
                 FROM skills WHERE id = ?1",
                params![id.to_string()],
                row_to_skill,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Full catalog, ordered by name.
    pub fn list_skills(&self) -> Result<Vec<Skill>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, slug, name, category, skill_level, hourly_rate
             FROM skills ORDER BY name ASC",
        )?;

        let rows = stmt.query_map([], row_to_skill)?;

        let mut skills = Vec::new();
        for row in rows {
            skills.push(row?);
        }
        Ok(skills)
    }

    /// Catalog entries in one category, ordered by name.
    pub fn skills_by_category(&self, category: &str) -> Result<Vec<Skill>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, slug, name, category, skill_level, hourly_rate
             FROM skills WHERE category = ?1 ORDER BY name ASC",
        )?;

        let rows = stmt.query_map(params![category], row_to_skill)?;

        let mut skills = Vec::new();
        for row in rows {
            skills.push(row?);
        }
        Ok(skills)
    }

    /// Distinct category names, sorted.
    pub fn skill_categories(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT DISTINCT category FROM skills ORDER BY category ASC")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    /// Search users offering skills, best rated first.
    pub fn search_teachers(&self, filters: &TeacherSearchFilters) -> Result<Vec<TeacherMatch>> {
        let mut sql = String::from(
            "SELECT DISTINCT u.id, u.public_id, u.name, u.email, u.location, u.bio,
                    u.points_balance, u.average_rating, u.created_at,
                    so.skill_level, so.hourly_rate, so.description,
                    s.name, s.category
             FROM users u
             JOIN skill_offerings so ON u.id = so.user_id
             JOIN skills s ON so.skill_id = s.id
             WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(skill) = &filters.skill {
            sql.push_str(&format!(" AND s.name LIKE ?{}", args.len() + 1));
            args.push(Box::new(format!("%{skill}%")));
        }
        if let Some(category) = &filters.category {
            sql.push_str(&format!(" AND s.category = ?{}", args.len() + 1));
            args.push(Box::new(category.clone()));
        }
        if let Some(location) = &filters.location {
            sql.push_str(&format!(" AND u.location LIKE ?{}", args.len() + 1));
            args.push(Box::new(format!("%{location}%")));
        }
        if let Some(level) = &filters.skill_level {
            sql.push_str(&format!(" AND so.skill_level = ?{}", args.len() + 1));
            args.push(Box::new(level.clone()));
        }
        if let Some(min_rating) = filters.min_rating {
            sql.push_str(&format!(" AND u.average_rating >= ?{}", args.len() + 1));
            args.push(Box::new(min_rating));
        }
        if let Some(max_rate) = filters.max_hourly_rate {
            sql.push_str(&format!(" AND so.hourly_rate <= ?{}", args.len() + 1));
            args.push(Box::new(max_rate));
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
            row_to_teacher_match,
        )?;

        let mut teachers = Vec::new();
        for row in rows {
            teachers.push(row?);
        }
        Ok(teachers)
    }
}

fn row_to_skill(row: &rusqlite::Row<'_>) -> rusqlite::Result<Skill> {
    Ok(Skill {
        id: row::col_uuid(row, 0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        skill_level: row.get(4)?,
        hourly_rate: row.get(5)?,
    })
}

fn row_to_teacher_match(row: &rusqlite::Row<'_>) -> rusqlite::Result<TeacherMatch> {
    Ok(TeacherMatch {
        teacher: UserProfile {
            id: row::col_uuid(row, 0)?,
            public_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            location: row.get(4)?,
            bio: row.get(5)?,
            points_balance: row.get(6)?,
            average_rating: row.get(7)?,
            created_at: row::col_ts(row, 8)?,
        },
        skill_level: row.get(9)?,
        hourly_rate: row.get(10)?,
        skill_description: row.get(11)?,
        skill_name: row.get(12)?,
        skill_category: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_user, test_db};

    #[test]
    fn catalog_round_trip() {
        let db = test_db();
        db.create_skill("Guitar", "Music", "Intermediate", 30).unwrap();
        db.create_skill("Cooking", "Lifestyle", "Beginner", 20).unwrap();
        db.create_skill("Photography", "Arts", "Advanced", 40).unwrap();

        let all = db.list_skills().unwrap();
        assert_eq!(all.len(), 3);
        // Ordered by name.
        assert_eq!(all[0].name, "Cooking");

        let categories = db.skill_categories().unwrap();
        assert_eq!(categories, vec!["Arts", "Lifestyle", "Music"]);

        let music = db.skills_by_category("Music").unwrap();
        assert_eq!(music.len(), 1);
        assert_eq!(music[0].name, "Guitar");
    }

    #[test]
    fn same_name_twice_gets_distinct_slugs() {
        let db = test_db();
        let a = db.create_skill("Yoga", "Fitness", "Beginner", 25).unwrap();
        let b = db.create_skill("Yoga", "Fitness", "Expert", 45).unwrap();
        assert_ne!(a.slug, b.slug);
    }

    #[test]
    fn teacher_search_filters_by_rate_and_category() {
        let db = test_db();
        let alice = db.create_user(&new_user("a@example.com")).unwrap();
        let bob = db.create_user(&new_user("b@example.com")).unwrap();
        let guitar = db.create_skill("Guitar", "Music", "Intermediate", 30).unwrap();
        let yoga = db.create_skill("Yoga", "Fitness", "Beginner", 25).unwrap();

        db.upsert_offering(alice.id, guitar.id, "Advanced", 45, "acoustic lessons")
            .unwrap();
        db.upsert_offering(bob.id, yoga.id, "Expert", 35, "vinyasa flow").unwrap();

        let cheap = db
            .search_teachers(&TeacherSearchFilters {
                max_hourly_rate: Some(40),
                limit: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap[0].teacher.id, bob.id);
        assert_eq!(cheap[0].skill_name, "Yoga");

        let music = db
            .search_teachers(&TeacherSearchFilters {
                category: Some("Music".into()),
                limit: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(music.len(), 1);
        assert_eq!(music[0].teacher.id, alice.id);
    }
}
