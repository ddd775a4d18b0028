use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgArguments, PgDatabaseError, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};

use crate::err::Error;
use crate::schema::{Field, FieldKind, Id, Record, Schema, Value, Values};
use crate::store::{conflict, PageRequest, Store};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Store backed by PostgreSQL. Constraints live in the tables created by
/// [`PgStore::migrate`]; violations are mapped back to the offending field.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        log::info!("Connected to PostgreSQL ({} connections max)", max_connections);
        Ok(Self::new(pool))
    }

    /// Creates missing tables. Referenced tables must come first.
    pub async fn migrate<I>(&self, schemas: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = &'static Schema>,
    {
        for schema in schemas {
            log::info!("Ensuring table `{}` exists", schema.table);
            let sql = schema.create_table_sql();
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn bind_value<'q>(query: PgQuery<'q>, field: &Field, value: Value) -> PgQuery<'q> {
    match value {
        Value::Null => match field.kind {
            FieldKind::Bool => query.bind(None::<bool>),
            FieldKind::Date => query.bind(None::<NaiveDate>),
            FieldKind::DateTime => query.bind(None::<DateTime<Utc>>),
            FieldKind::ForeignKey { .. } => query.bind(None::<i64>),
            _ => query.bind(None::<String>),
        },
        Value::Bool(b) => query.bind(b),
        Value::Int(i) => query.bind(i),
        Value::Text(s) => query.bind(s),
        Value::Date(d) => query.bind(d),
        Value::DateTime(t) => query.bind(t),
    }
}

fn decode(schema: &'static Schema, row: &PgRow) -> Result<Record, Error> {
    let id: i64 = row.try_get("id")?;
    let mut values = Values::new();
    for field in schema.fields {
        let name = field.name;
        let value = match field.kind {
            FieldKind::Bool => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
            FieldKind::Date => row.try_get::<Option<NaiveDate>, _>(name)?.map(Value::Date),
            FieldKind::DateTime => row
                .try_get::<Option<DateTime<Utc>>, _>(name)?
                .map(Value::DateTime),
            FieldKind::ForeignKey { .. } => row.try_get::<Option<i64>, _>(name)?.map(Value::Int),
            _ => row.try_get::<Option<String>, _>(name)?.map(Value::Text),
        };
        values.insert(name, value.unwrap_or(Value::Null));
    }
    Ok(Record { id, values })
}

fn map_db_error(schema: &'static Schema, err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if let Some(pg) = db.try_downcast_ref::<PgDatabaseError>() {
            let field = pg
                .constraint()
                .and_then(|constraint| schema.field_for_constraint(constraint));
            match (pg.code(), field) {
                (UNIQUE_VIOLATION, Some(field)) => return conflict(schema, field),
                (FOREIGN_KEY_VIOLATION, Some(field)) => {
                    return Error::validation(
                        field.name,
                        pg.detail().unwrap_or("Referenced row does not exist."),
                    )
                }
                _ => {}
            }
        }
    }
    Error::from(err)
}

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, schema: &'static Schema, mut values: Values) -> Result<Record, Error> {
        let mut columns = Vec::new();
        let mut bound = Vec::new();
        for field in schema.fields {
            if let Some(value) = values.remove(field.name) {
                columns.push(field.name);
                bound.push((field, value));
            }
        }
        let placeholders = (1..=columns.len())
            .map(|n| format!("${}", n))
            .collect::<Vec<_>>();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            schema.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        let mut query = sqlx::query(&sql);
        for (field, value) in bound {
            query = bind_value(query, field, value);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_db_error(schema, err))?;
        decode(schema, &row)
    }

    async fn fetch(&self, schema: &'static Schema, id: Id) -> Result<Option<Record>, Error> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", schema.table);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| decode(schema, &row)).transpose()
    }

    async fn list(
        &self,
        schema: &'static Schema,
        page: PageRequest,
    ) -> Result<(Vec<Record>, u64), Error> {
        let count_sql = format!("SELECT COUNT(*) FROM {}", schema.table);
        let total = sqlx::query_scalar::<Postgres, i64>(&count_sql)
            .fetch_one(&self.pool)
            .await?;
        let sql = format!(
            "SELECT * FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            schema.table
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.per_page))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;
        let records = rows
            .iter()
            .map(|row| decode(schema, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total.max(0) as u64))
    }

    async fn update(
        &self,
        schema: &'static Schema,
        id: Id,
        mut changes: Values,
    ) -> Result<Option<Record>, Error> {
        let mut assignments = Vec::new();
        let mut bound = Vec::new();
        for field in schema.fields {
            if let Some(value) = changes.remove(field.name) {
                assignments.push(format!("{} = ${}", field.name, assignments.len() + 1));
                bound.push((field, value));
            }
        }
        if assignments.is_empty() {
            return self.fetch(schema, id).await;
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ${} RETURNING *",
            schema.table,
            assignments.join(", "),
            assignments.len() + 1
        );
        let mut query = sqlx::query(&sql);
        for (field, value) in bound {
            query = bind_value(query, field, value);
        }
        let row = query
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_db_error(schema, err))?;
        row.map(|row| decode(schema, &row)).transpose()
    }

    async fn delete(&self, schema: &'static Schema, id: Id) -> Result<bool, Error> {
        let sql = format!("DELETE FROM {} WHERE id = $1", schema.table);
        let res = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() >= 1)
    }
}
