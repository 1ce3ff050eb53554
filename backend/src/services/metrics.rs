use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, CounterVec, Gauge};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by outcome (registered, authenticated, rejected)",
        &["outcome"]
    ).unwrap();

    pub static ref CHILD_OPERATIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_child_operations_total",
        "Successful child profile writes by operation",
        &["operation"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref USERS_GAUGE: Gauge = register_gauge!(
        "family_users_total",
        "Registered parent accounts"
    ).unwrap();

    pub static ref CHILDREN_GAUGE: Gauge = register_gauge!(
        "family_children_total",
        "Child profiles, including ones no longer linked to any parent"
    ).unwrap();

    pub static ref ACTIVE_RELATIONS_GAUGE: Gauge = register_gauge!(
        "family_relations_active_total",
        "Active parent-child relations"
    ).unwrap();
}

pub fn record_login(outcome: &str) {
    LOGINS_COUNTER.with_label_values(&[outcome]).inc();
}

pub fn record_child_operation(operation: &str) {
    CHILD_OPERATIONS_COUNTER.with_label_values(&[operation]).inc();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM users")
        .fetch_one(pool)
        .await?;
    USERS_GAUGE.set(users as f64);

    let children: i64 = sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM child_info")
        .fetch_one(pool)
        .await?;
    CHILDREN_GAUGE.set(children as f64);

    let relations: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM parent_child_relation WHERE status = 1",
    )
    .fetch_one(pool)
    .await?;
    ACTIVE_RELATIONS_GAUGE.set(relations as f64);

    info!("Metrics: collected ({users} users, {children} children, {relations} active relations)");
    Ok(())
}
