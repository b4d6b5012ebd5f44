use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{now_timestamp, Db};
use crate::error::{AppError, AppResult};
use crate::models::{Contact, ContactInput, ContactMethod, ImportReport, MethodInput, Pagination};

/// `limit` sentinel meaning "return every matching row, unpaginated".
pub const NO_LIMIT: i64 = -1;

#[derive(Debug, Clone)]
pub struct ListFilter {
    pub page: i64,
    pub limit: i64,
    pub search: String,
    pub bookmarked_only: bool,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 100,
            search: String::new(),
            bookmarked_only: false,
        }
    }
}

enum MethodOrder {
    ById,
    ByType,
}

/// Methods are fetched with a second query keyed by contact id rather than a
/// delimiter-joined aggregate, so a `type` or `value` containing the delimiter
/// can never corrupt the decode.
fn fetch_methods(
    conn: &Connection,
    contact_id: &str,
    order: MethodOrder,
) -> rusqlite::Result<Vec<ContactMethod>> {
    let sql = match order {
        MethodOrder::ById => {
            "SELECT type, value FROM contact_methods WHERE contact_id = ?1 ORDER BY id"
        }
        MethodOrder::ByType => {
            "SELECT type, value FROM contact_methods WHERE contact_id = ?1 ORDER BY type"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    let methods = stmt
        .query_map(params![contact_id], |row| {
            Ok(ContactMethod {
                kind: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(methods)
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        name: row.get(1)?,
        notes: row.get(2)?,
        bookmarked: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        methods: vec![],
    })
}

pub fn list_contacts(db: &Db, filter: &ListFilter) -> AppResult<(Vec<Contact>, Pagination)> {
    let conn = db.lock();

    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if !filter.search.is_empty() {
        clauses.push(
            "(c.name LIKE ? OR c.notes LIKE ? OR EXISTS \
             (SELECT 1 FROM contact_methods m WHERE m.contact_id = c.id AND m.value LIKE ?))",
        );
        let pattern = format!("%{}%", filter.search);
        for _ in 0..3 {
            args.push(Box::new(pattern.clone()));
        }
    }
    if filter.bookmarked_only {
        clauses.push("c.bookmarked = 1");
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    // Total matching count with the same predicate, for pagination metadata.
    let count_sql = format!("SELECT COUNT(*) FROM contacts c{where_sql}");
    let total: i64 = conn.query_row(
        &count_sql,
        params_from_iter(args.iter().map(|a| a.as_ref())),
        |row| row.get(0),
    )?;

    let page = filter.page.max(1);
    let mut sql = format!(
        "SELECT c.id, c.name, c.notes, c.bookmarked, c.created_at, c.updated_at \
         FROM contacts c{where_sql} ORDER BY c.updated_at DESC"
    );
    if filter.limit != NO_LIMIT {
        let limit = filter.limit.max(1);
        sql.push_str(" LIMIT ? OFFSET ?");
        args.push(Box::new(limit));
        args.push(Box::new((page - 1) * limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut contacts = stmt
        .query_map(
            params_from_iter(args.iter().map(|a| a.as_ref())),
            row_to_contact,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    for contact in &mut contacts {
        contact.methods = fetch_methods(&conn, &contact.id, MethodOrder::ById)?;
    }

    let pages = if filter.limit == NO_LIMIT {
        1
    } else {
        let limit = filter.limit.max(1);
        (total + limit - 1) / limit
    };

    Ok((
        contacts,
        Pagination {
            page,
            limit: filter.limit,
            total,
            pages,
        },
    ))
}

pub fn get_contact(db: &Db, id: &str) -> AppResult<Contact> {
    let conn = db.lock();
    let contact = conn
        .query_row(
            "SELECT id, name, notes, bookmarked, created_at, updated_at \
             FROM contacts WHERE id = ?1",
            params![id],
            row_to_contact,
        )
        .optional()?;

    let mut contact = contact.ok_or(AppError::NotFound("contact"))?;
    contact.methods = fetch_methods(&conn, id, MethodOrder::ByType)?;
    Ok(contact)
}

/// Insert the valid methods of one contact through a single prepared statement.
/// Entries missing `type` or `value` are skipped, not errored.
fn insert_methods(conn: &Connection, contact_id: &str, methods: &[MethodInput]) -> rusqlite::Result<()> {
    let mut stmt =
        conn.prepare("INSERT INTO contact_methods (contact_id, type, value) VALUES (?1, ?2, ?3)")?;
    for m in methods {
        if m.kind.trim().is_empty() || m.value.trim().is_empty() {
            continue;
        }
        stmt.execute(params![contact_id, m.kind, m.value])?;
    }
    Ok(())
}

pub fn create_contact(db: &Db, input: &ContactInput) -> AppResult<(String, String)> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }

    let mut conn = db.lock();
    let tx = conn.transaction()?;

    let id = Uuid::new_v4().to_string();
    let now = now_timestamp();
    tx.execute(
        "INSERT INTO contacts (id, name, notes, bookmarked, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, input.name, input.notes, input.bookmarked, now, now],
    )?;
    insert_methods(&tx, &id, &input.methods)?;

    tx.commit()?;
    Ok((id, input.name.clone()))
}

/// Full-replace semantics: scalars are overwritten and the whole method set is
/// deleted and reinserted, so omitting `methods` clears it.
pub fn update_contact(db: &Db, id: &str, input: &ContactInput) -> AppResult<String> {
    if input.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }

    let mut conn = db.lock();
    let exists: Option<String> = conn
        .query_row("SELECT id FROM contacts WHERE id = ?1", params![id], |r| {
            r.get(0)
        })
        .optional()?;
    if exists.is_none() {
        return Err(AppError::NotFound("contact"));
    }

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE contacts SET name = ?1, notes = ?2, bookmarked = ?3, updated_at = ?4 WHERE id = ?5",
        params![input.name, input.notes, input.bookmarked, now_timestamp(), id],
    )?;
    tx.execute(
        "DELETE FROM contact_methods WHERE contact_id = ?1",
        params![id],
    )?;
    insert_methods(&tx, id, &input.methods)?;

    tx.commit()?;
    Ok(input.name.clone())
}

/// Returns the deleted contact's name for the confirmation message.
pub fn delete_contact(db: &Db, id: &str) -> AppResult<String> {
    let mut conn = db.lock();
    let name: Option<String> = conn
        .query_row(
            "SELECT name FROM contacts WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(name) = name else {
        return Err(AppError::NotFound("contact"));
    };

    let tx = conn.transaction()?;
    // Explicit even though the FK cascade would cover it.
    tx.execute(
        "DELETE FROM contact_methods WHERE contact_id = ?1",
        params![id],
    )?;
    tx.execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
    tx.commit()?;

    Ok(name)
}

/// Bulk import with row-level tolerance: a bad row is recorded (1-based index)
/// and counted failed, and the batch still commits once at the end. Only a
/// store-fatal error rolls the whole transaction back.
pub fn import_contacts(db: &Db, rows: &[ContactInput]) -> AppResult<ImportReport> {
    if rows.is_empty() {
        return Err(AppError::Validation(
            "contacts must be a non-empty array".into(),
        ));
    }

    let mut conn = db.lock();
    let tx = conn.transaction()?;

    let mut report = ImportReport {
        total: rows.len(),
        ..Default::default()
    };

    for (idx, row) in rows.iter().enumerate() {
        let line = idx + 1;
        if row.name.trim().is_empty() {
            report.errors.push(format!("row {line}: name must not be empty"));
            report.failed += 1;
            continue;
        }

        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        let inserted = tx
            .execute(
                "INSERT INTO contacts (id, name, notes, bookmarked, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, row.name, row.notes, row.bookmarked, now, now],
            )
            .and_then(|_| insert_methods(&tx, &id, &row.methods));

        match inserted {
            Ok(()) => report.success += 1,
            Err(e) => {
                report
                    .errors
                    .push(format!("row {line} \"{}\": {e}", row.name));
                report.failed += 1;
            }
        }
    }

    tx.commit()?;
    report.errors.truncate(10);
    Ok(report)
}
