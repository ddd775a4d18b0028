use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::err::Error;
use crate::schema::{FieldKind, Id, OnDelete, Record, Schema, Value, Values};
use crate::store::{conflict, missing_reference, PageRequest, Store};

struct Table {
    schema: &'static Schema,
    next_id: Id,
    rows: BTreeMap<Id, Values>,
}

impl Table {
    fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

type Tables = HashMap<&'static str, Table>;

/// In-process store. Every write holds the lock across its constraint checks.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(
    tables: &Tables,
    schema: &'static Schema,
    values: &Values,
    except: Option<Id>,
) -> Result<(), Error> {
    let table = match tables.get(schema.table) {
        Some(table) => table,
        None => return Ok(()),
    };
    for field in schema.fields.iter().filter(|field| field.unique) {
        let value = match values.get(field.name) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        let taken = table
            .rows
            .iter()
            .any(|(id, row)| Some(*id) != except && row.get(field.name) == Some(value));
        if taken {
            return Err(conflict(schema, field));
        }
    }
    Ok(())
}

fn check_references(tables: &Tables, schema: &'static Schema, values: &Values) -> Result<(), Error> {
    for field in schema.fields {
        if let (FieldKind::ForeignKey { to, .. }, Some(Value::Int(id))) =
            (field.kind, values.get(field.name))
        {
            let exists = tables
                .get(to)
                .map_or(false, |table| table.rows.contains_key(id));
            if !exists {
                return Err(missing_reference(field, to, *id));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, schema: &'static Schema, values: Values) -> Result<Record, Error> {
        let mut tables = self.tables.write().await;
        check_references(&tables, schema, &values)?;
        check_unique(&tables, schema, &values, None)?;
        let table = tables
            .entry(schema.table)
            .or_insert_with(|| Table::new(schema));
        let id = table.next_id;
        table.next_id += 1;
        table.rows.insert(id, values.clone());
        Ok(Record { id, values })
    }

    async fn fetch(&self, schema: &'static Schema, id: Id) -> Result<Option<Record>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(schema.table)
            .and_then(|table| table.rows.get(&id))
            .map(|values| Record {
                id,
                values: values.clone(),
            }))
    }

    async fn list(
        &self,
        schema: &'static Schema,
        page: PageRequest,
    ) -> Result<(Vec<Record>, u64), Error> {
        let tables = self.tables.read().await;
        let table = match tables.get(schema.table) {
            Some(table) => table,
            None => return Ok((Vec::new(), 0)),
        };
        let records = table
            .rows
            .iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .map(|(id, values)| Record {
                id: *id,
                values: values.clone(),
            })
            .collect();
        Ok((records, table.rows.len() as u64))
    }

    async fn update(
        &self,
        schema: &'static Schema,
        id: Id,
        changes: Values,
    ) -> Result<Option<Record>, Error> {
        let mut tables = self.tables.write().await;
        let mut merged = match tables
            .get(schema.table)
            .and_then(|table| table.rows.get(&id))
        {
            Some(values) => values.clone(),
            None => return Ok(None),
        };
        check_references(&tables, schema, &changes)?;
        merged.extend(changes);
        check_unique(&tables, schema, &merged, Some(id))?;
        if let Some(table) = tables.get_mut(schema.table) {
            table.rows.insert(id, merged.clone());
        }
        Ok(Some(Record { id, values: merged }))
    }

    async fn delete(&self, schema: &'static Schema, id: Id) -> Result<bool, Error> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .get(schema.table)
            .map_or(false, |table| table.rows.contains_key(&id));
        if !exists {
            return Ok(false);
        }

        let mut pending = vec![(schema.table, id)];
        while let Some((target, id)) = pending.pop() {
            let removed = tables
                .get_mut(target)
                .and_then(|table| table.rows.remove(&id));
            if removed.is_none() {
                continue;
            }
            for table in tables.values_mut() {
                let referencing = table.schema;
                for field in referencing.fields {
                    let on_delete = match field.kind {
                        FieldKind::ForeignKey { to, on_delete } if to == target => on_delete,
                        _ => continue,
                    };
                    for (row_id, row) in table.rows.iter_mut() {
                        if row.get(field.name) != Some(&Value::Int(id)) {
                            continue;
                        }
                        match on_delete {
                            OnDelete::Cascade => pending.push((referencing.table, *row_id)),
                            OnDelete::SetNull => {
                                row.insert(field.name, Value::Null);
                            }
                        }
                    }
                }
            }
        }
        Ok(true)
    }
}
