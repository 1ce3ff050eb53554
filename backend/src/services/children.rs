use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{info, warn};

use crate::{
    error::AppError,
    models::child::{
        non_empty, non_zero, Child, ChildWithRelation, CreateChildRequest, UpdateChildRequest,
        RELATION_ACTIVE, RELATION_REVOKED,
    },
    services::{
        metrics,
        normalize::{normalize_gender, normalize_grade},
    },
};

/// Appends the authorization gate: `child_info c` must have an active
/// relation to `parent_id`. Every per-parent read and write goes through it.
fn push_owned_by_parent(query: &mut QueryBuilder<'_, Postgres>, parent_id: i64) {
    query.push(
        " AND EXISTS (SELECT 1 FROM parent_child_relation r
          WHERE r.child_id = c.id AND r.status = 1 AND r.parent_id = ",
    );
    query.push_bind(parent_id);
    query.push(")");
}

pub struct ChildService;

impl ChildService {
    /// Children linked to `parent_id` by an active relation, newest first.
    pub async fn list_for_parent(pool: &PgPool, parent_id: i64) -> Result<Vec<ChildWithRelation>, AppError> {
        let children = sqlx::query_as::<_, ChildWithRelation>(
            "SELECT c.*, r.relation_type, r.status AS relation_status
             FROM child_info c
             INNER JOIN parent_child_relation r ON c.id = r.child_id
             WHERE r.parent_id = $1 AND r.status = 1
             ORDER BY c.create_time DESC, c.id DESC",
        )
        .bind(parent_id)
        .fetch_all(pool)
        .await?;
        Ok(children)
    }

    /// Loads a child only if `parent_id` holds an active relation to it.
    ///
    /// A missing child, another parent's child and a revoked relation all
    /// yield [`AppError::ChildNotAccessible`] so callers cannot probe for ids.
    pub async fn resolve_owned_child(pool: &PgPool, parent_id: i64, child_id: i64) -> Result<Child, AppError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT c.* FROM child_info c WHERE c.id = ");
        query.push_bind(child_id);
        push_owned_by_parent(&mut query, parent_id);

        query
            .build_query_as::<Child>()
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::ChildNotAccessible)
    }

    /// Creates the child and its relation to `parent_id` in one transaction.
    pub async fn create(pool: &PgPool, parent_id: i64, req: &CreateChildRequest) -> Result<Child, AppError> {
        let child_name = req
            .child_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::validation("child_name is required"))?;

        let mut tx = pool.begin().await?;
        let child_id = match Self::insert_with_relation(&mut tx, parent_id, child_name, req).await {
            Ok(id) => id,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("rollback after failed child insert also failed: {rollback_err}");
                }
                return Err(e);
            }
        };
        tx.commit().await?;

        let child = sqlx::query_as::<_, Child>("SELECT * FROM child_info WHERE id = $1 LIMIT 1")
            .bind(child_id)
            .fetch_one(pool)
            .await?;

        info!(parent_id, child_id, "child profile created");
        metrics::record_child_operation("create");
        Ok(child)
    }

    async fn insert_with_relation(
        tx: &mut Transaction<'_, Postgres>,
        parent_id: i64,
        child_name: &str,
        req: &CreateChildRequest,
    ) -> Result<i64, AppError> {
        let grade = normalize_grade(req.grade.as_deref());
        let gender = normalize_gender(req.gender.as_ref());

        let child_id: i64 = sqlx::query_scalar(
            "INSERT INTO child_info
                (child_name, gender, age, grade_type, grade_code, grade_name, avatar, remark)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(child_name)
        .bind(gender.code())
        .bind(non_zero(req.age))
        .bind(grade.grade_type)
        .bind(grade.grade_code)
        .bind(grade.grade_name)
        .bind(non_empty(req.avatar.clone()))
        .bind(non_empty(req.remark.clone()))
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO parent_child_relation (parent_id, child_id, relation_type, status)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(parent_id)
        .bind(child_id)
        .bind(req.relation_type())
        .bind(RELATION_ACTIVE)
        .execute(&mut **tx)
        .await?;

        Ok(child_id)
    }

    /// Applies the fields present in `req` and returns the updated row.
    pub async fn update(
        pool: &PgPool,
        parent_id: i64,
        child_id: i64,
        req: &UpdateChildRequest,
    ) -> Result<Child, AppError> {
        Self::resolve_owned_child(pool, parent_id, child_id).await?;

        if req.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }

        let mut query = QueryBuilder::<Postgres>::new("UPDATE child_info c SET ");
        {
            let mut set = query.separated(", ");

            if let Some(name) = &req.child_name {
                let name = name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| AppError::validation("child_name cannot be empty"))?;
                set.push("child_name = ");
                set.push_bind_unseparated(name);
            }
            if let Some(gender) = &req.gender {
                set.push("gender = ");
                set.push_bind_unseparated(normalize_gender(gender.as_ref()).code());
            }
            if let Some(age) = req.age {
                set.push("age = ");
                set.push_bind_unseparated(non_zero(age));
            }
            if let Some(grade) = &req.grade {
                // all three grade columns move together
                let grade = normalize_grade(grade.as_deref());
                set.push("grade_type = ");
                set.push_bind_unseparated(grade.grade_type);
                set.push("grade_code = ");
                set.push_bind_unseparated(grade.grade_code);
                set.push("grade_name = ");
                set.push_bind_unseparated(grade.grade_name);
            }
            if let Some(avatar) = &req.avatar {
                set.push("avatar = ");
                set.push_bind_unseparated(non_empty(avatar.clone()));
            }
            if let Some(remark) = &req.remark {
                set.push("remark = ");
                set.push_bind_unseparated(non_empty(remark.clone()));
            }
            set.push("update_time = NOW()");
        }

        query.push(" WHERE c.id = ");
        query.push_bind(child_id);
        push_owned_by_parent(&mut query, parent_id);
        query.push(" RETURNING *");

        // the gate is re-applied here in case the relation was revoked meanwhile
        let child = query
            .build_query_as::<Child>()
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::ChildNotAccessible)?;

        info!(parent_id, child_id, "child profile updated");
        metrics::record_child_operation("update");
        Ok(child)
    }

    /// Revokes the caller's relation to the child. The child row stays.
    pub async fn remove_for_parent(pool: &PgPool, parent_id: i64, child_id: i64) -> Result<(), AppError> {
        Self::resolve_owned_child(pool, parent_id, child_id).await?;

        let result = sqlx::query(
            "UPDATE parent_child_relation
             SET status = $3, update_time = NOW()
             WHERE parent_id = $1 AND child_id = $2 AND status = 1",
        )
        .bind(parent_id)
        .bind(child_id)
        .bind(RELATION_REVOKED)
        .execute(pool)
        .await?;

        // revoked concurrently between the check and the update
        if result.rows_affected() == 0 {
            return Err(AppError::ChildNotAccessible);
        }

        info!(parent_id, child_id, "parent-child relation revoked");
        metrics::record_child_operation("delete");
        Ok(())
    }
}
