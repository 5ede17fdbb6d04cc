//! Demo company database used by `sqlreact seed` and the test suites

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};

use crate::persistence::error::PersistenceError;

const DEPARTMENTS: &[(i64, &str, &str)] = &[
    (1, "Engineering", "San Francisco"),
    (2, "Marketing", "New York"),
    (3, "Sales", "Chicago"),
];

const EMPLOYEES: &[(i64, &str, &str, i64, f64, &str)] = &[
    (1, "Alice Johnson", "alice@company.com", 1, 95000.0, "2022-01-15"),
    (2, "Bob Smith", "bob@company.com", 1, 87000.0, "2022-03-20"),
    (3, "Carol White", "carol@company.com", 1, 110000.0, "2021-06-10"),
    (4, "David Brown", "david@company.com", 2, 72000.0, "2023-02-01"),
    (5, "Eve Davis", "eve@company.com", 2, 68000.0, "2023-05-15"),
    (6, "Frank Miller", "frank@company.com", 3, 65000.0, "2022-09-01"),
    (7, "Grace Lee", "grace@company.com", 3, 70000.0, "2022-11-20"),
    (8, "Henry Wilson", "henry@company.com", 3, 75000.0, "2021-12-01"),
];

const CREATE_DEPARTMENTS: &str = "CREATE TABLE departments (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    location TEXT
)";

const CREATE_EMPLOYEES: &str = "CREATE TABLE employees (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT UNIQUE,
    department_id INTEGER REFERENCES departments(id),
    salary REAL,
    hire_date TEXT
)";

/// Create `departments` and `employees` on a writable connection and fill them
pub async fn seed_company_tables(conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    let mut tx = conn.begin().await?;

    sqlx::query(CREATE_DEPARTMENTS).execute(&mut *tx).await?;
    sqlx::query(CREATE_EMPLOYEES).execute(&mut *tx).await?;

    for (id, name, location) in DEPARTMENTS {
        sqlx::query("INSERT INTO departments (id, name, location) VALUES (?, ?, ?)")
            .bind(*id)
            .bind(*name)
            .bind(*location)
            .execute(&mut *tx)
            .await?;
    }

    for (id, name, email, department_id, salary, hire_date) in EMPLOYEES {
        sqlx::query(
            "INSERT INTO employees (id, name, email, department_id, salary, hire_date) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(*id)
        .bind(*name)
        .bind(*email)
        .bind(*department_id)
        .bind(*salary)
        .bind(*hire_date)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Create (or recreate) the demo database file at `path`
pub async fn seed_company_database(path: &Path) -> Result<(), PersistenceError> {
    if path.exists() {
        std::fs::remove_file(path)?;
        tracing::info!("Removed existing database: {}", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .connect()
        .await
        .map_err(|e| PersistenceError::Connection(e.to_string()))?;

    seed_company_tables(&mut conn).await?;
    conn.close().await?;

    tracing::info!(
        "Created {} with {} departments and {} employees",
        path.display(),
        DEPARTMENTS.len(),
        EMPLOYEES.len()
    );
    Ok(())
}
