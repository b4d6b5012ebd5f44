use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use crate::error::{AppError, AppResult};
use crate::models::{ContactInput, MethodInput};

const NAME_HEADERS: &[&str] = &["姓名", "name"];
const NOTES_HEADERS: &[&str] = &["备注", "notes"];
const BOOKMARK_HEADERS: &[&str] = &["是否收藏", "bookmarked"];
const METHOD_HEADERS: &[&str] = &[
    "手机号码",
    "邮箱地址",
    "联系地址",
    "社交账号",
    "phone",
    "email",
    "address",
    "social",
];

/// Parse an uploaded .xlsx workbook (first sheet only) into contact rows.
/// The bytes live in memory, so there is no temp file to clean up on any path.
pub fn parse_workbook(bytes: &[u8]) -> AppResult<Vec<ContactInput>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| AppError::FileFormat(format!("unreadable workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::FileFormat("workbook has no sheets".into()))?
        .map_err(|e| AppError::FileFormat(format!("unreadable sheet: {e}")))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| AppError::FileFormat("sheet is empty".into()))?
        .iter()
        .map(cell_text)
        .collect();
    let grid: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    rows_to_contacts(&header, &grid)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Bool(b) => b.to_string(),
        // Phone numbers come back as floats; keep them integral.
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// Map header-named columns onto contact rows. The header cell text itself
/// becomes the stored method `type`, so 手机号码 and `phone` stay distinct labels.
pub fn rows_to_contacts(header: &[String], rows: &[Vec<String>]) -> AppResult<Vec<ContactInput>> {
    if rows.is_empty() {
        return Err(AppError::FileFormat("no data rows in sheet".into()));
    }

    let name_col = find_col(header, NAME_HEADERS)
        .ok_or_else(|| AppError::FileFormat("missing 姓名/name column".into()))?;
    let notes_col = find_col(header, NOTES_HEADERS);
    let bookmark_col = find_col(header, BOOKMARK_HEADERS);
    let method_cols: Vec<(usize, &String)> = header
        .iter()
        .enumerate()
        .filter(|(_, h)| METHOD_HEADERS.iter().any(|m| h.eq_ignore_ascii_case(m)))
        .collect();

    let cell = |row: &[String], col: usize| row.get(col).cloned().unwrap_or_default();

    let mut contacts = Vec::with_capacity(rows.len());
    for row in rows {
        let mut contact = ContactInput {
            name: cell(row, name_col),
            notes: notes_col.map(|c| cell(row, c)).unwrap_or_default(),
            bookmarked: bookmark_col
                .map(|c| is_truthy(&cell(row, c)))
                .unwrap_or(false),
            methods: Vec::new(),
        };

        for (col, label) in &method_cols {
            for value in split_values(&cell(row, *col)) {
                contact.methods.push(MethodInput {
                    kind: (*label).clone(),
                    value,
                });
            }
        }

        contacts.push(contact);
    }

    Ok(contacts)
}

fn find_col(header: &[String], candidates: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|h| candidates.iter().any(|c| h.eq_ignore_ascii_case(c)))
}

fn is_truthy(cell: &str) -> bool {
    matches!(cell, "是" | "true" | "TRUE" | "True" | "1")
}

/// Multi-value cells hold several entries of one type, split on the common
/// delimiters including the full-width comma.
fn split_values(raw: &str) -> Vec<String> {
    raw.split([';', ',', '，'])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn maps_chinese_headers() {
        let header = headers(&["姓名", "备注", "是否收藏", "手机号码", "邮箱地址"]);
        let rows = vec![row(&["张三", "公司同事", "是", "13800138000", "zhangsan@example.com"])];

        let contacts = rows_to_contacts(&header, &rows).unwrap();
        assert_eq!(contacts.len(), 1);
        let c = &contacts[0];
        assert_eq!(c.name, "张三");
        assert_eq!(c.notes, "公司同事");
        assert!(c.bookmarked);
        assert_eq!(c.methods.len(), 2);
        assert_eq!(c.methods[0].kind, "手机号码");
        assert_eq!(c.methods[0].value, "13800138000");
        assert_eq!(c.methods[1].kind, "邮箱地址");
        assert_eq!(c.methods[1].value, "zhangsan@example.com");
    }

    #[test]
    fn maps_english_headers_case_insensitively() {
        let header = headers(&["Name", "Notes", "Bookmarked", "Email"]);
        let rows = vec![row(&["Alice", "", "true", "alice@example.com"])];

        let contacts = rows_to_contacts(&header, &rows).unwrap();
        assert_eq!(contacts[0].name, "Alice");
        assert!(contacts[0].bookmarked);
        assert_eq!(contacts[0].methods[0].kind, "Email");
    }

    #[test]
    fn splits_multi_value_cells_on_all_delimiters() {
        let header = headers(&["姓名", "邮箱地址"]);
        let rows = vec![row(&["张三", "a@x.com; b@x.com，c@x.com,d@x.com"])];

        let contacts = rows_to_contacts(&header, &rows).unwrap();
        let values: Vec<&str> = contacts[0].methods.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, vec!["a@x.com", "b@x.com", "c@x.com", "d@x.com"]);
    }

    #[test]
    fn empty_method_cell_yields_no_entries() {
        let header = headers(&["姓名", "手机号码"]);
        let rows = vec![row(&["张三", ""])];

        let contacts = rows_to_contacts(&header, &rows).unwrap();
        assert!(contacts[0].methods.is_empty());
    }

    #[test]
    fn empty_name_cell_passes_through_for_row_level_handling() {
        // Name validation happens in the import path, where the row is
        // recorded as a soft failure instead of aborting the batch.
        let header = headers(&["姓名"]);
        let rows = vec![row(&[""]), row(&["乙"])];

        let contacts = rows_to_contacts(&header, &rows).unwrap();
        assert_eq!(contacts.len(), 2);
        assert!(contacts[0].name.is_empty());
    }

    #[test]
    fn missing_name_column_is_a_format_error() {
        let header = headers(&["备注"]);
        let rows = vec![row(&["x"])];
        let err = rows_to_contacts(&header, &rows).unwrap_err();
        assert!(matches!(err, AppError::FileFormat(_)));
    }

    #[test]
    fn no_data_rows_is_a_format_error() {
        let header = headers(&["姓名"]);
        let err = rows_to_contacts(&header, &[]).unwrap_err();
        assert!(matches!(err, AppError::FileFormat(_)));
    }

    #[test]
    fn unreadable_bytes_are_a_format_error() {
        let err = parse_workbook(b"definitely not a zip archive").unwrap_err();
        assert!(matches!(err, AppError::FileFormat(_)));
    }
}
