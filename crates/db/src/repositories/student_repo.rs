//! Repository for the `students` table.

use sqlx::PgExecutor;
use studyroom_core::types::{DbId, FamilyId};

use crate::models::lead::Lead;
use crate::models::student::Student;
use crate::models::tutor::TutorSnapshot;

const COLUMNS: &str = "\
    id, client_id, name, year_level, school, subjects, mode, suburb, postcode, \
    availability, goals, challenges, package_plan, assigned_tutor_id, \
    assigned_tutor_name, assigned_tutor_email, assigned_at, tutor_confirmed_at, \
    tutor_confirmed_by, created_at, updated_at";

pub struct StudentRepo;

impl StudentRepo {
    /// Create or re-assign the student materialized from a lead.
    ///
    /// A new assignment clears any earlier tutor confirmation.
    pub async fn upsert_from_lead<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
        client_id: FamilyId,
        lead: &Lead,
        tutor: &TutorSnapshot,
    ) -> Result<Student, sqlx::Error> {
        let query = format!(
            "INSERT INTO students (id, client_id, name, year_level, school, subjects, mode, \
                 suburb, postcode, availability, goals, challenges, package_plan, \
                 assigned_tutor_id, assigned_tutor_name, assigned_tutor_email, assigned_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, NOW()) \
             ON CONFLICT (id) DO UPDATE SET \
                 assigned_tutor_id = EXCLUDED.assigned_tutor_id, \
                 assigned_tutor_name = EXCLUDED.assigned_tutor_name, \
                 assigned_tutor_email = EXCLUDED.assigned_tutor_email, \
                 assigned_at = NOW(), \
                 tutor_confirmed_at = NULL, \
                 tutor_confirmed_by = NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .bind(client_id)
            .bind(&lead.student_name)
            .bind(&lead.year_level)
            .bind(&lead.school)
            .bind(&lead.subjects)
            .bind(lead.mode.as_str())
            .bind(&lead.suburb)
            .bind(&lead.postcode)
            .bind(&lead.availability)
            .bind(&lead.goals)
            .bind(&lead.challenges)
            .bind(&lead.package_plan)
            .bind(tutor.id)
            .bind(&tutor.name)
            .bind(&tutor.email)
            .fetch_one(exec)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE id = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(exec)
            .await
    }

    /// Students currently assigned to a tutor, newest assignment first.
    pub async fn list_for_tutor<'e, E: PgExecutor<'e>>(
        exec: E,
        tutor_id: DbId,
    ) -> Result<Vec<Student>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM students \
             WHERE assigned_tutor_id = $1 \
             ORDER BY assigned_at DESC NULLS LAST, id"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(tutor_id)
            .fetch_all(exec)
            .await
    }

    /// Record that the assigned tutor has accepted the student.
    ///
    /// Returns `None` if `tutor_id` is not the current assignee.
    pub async fn confirm_tutor<'e, E: PgExecutor<'e>>(
        exec: E,
        id: FamilyId,
        tutor_id: DbId,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!(
            "UPDATE students SET tutor_confirmed_at = NOW(), tutor_confirmed_by = $2 \
             WHERE id = $1 AND assigned_tutor_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .bind(tutor_id)
            .fetch_optional(exec)
            .await
    }
}
