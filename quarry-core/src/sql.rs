//! Best-effort extraction of metadata from statement text, plus the writers for the
//! statements generated by records.
//!
//! The scanning is regex based: subqueries in `FROM`, comma separated table lists and
//! schema qualified names are not understood.
use crate::separated_by;
use regex::{Captures, Regex};
use std::{borrow::Cow, sync::LazyLock};

static PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b((?:KEY|FOR)\s+)?(INTO|UPDATE|FROM|JOIN|UNION|DESCRIBE)(\s+)(`?)([A-Za-z_$][A-Za-z0-9_$]*)",
    )
    .expect("should compile")
});

static TABLES_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN|UNION)\s+(`?)([A-Za-z_$][A-Za-z0-9_$]*)")
        .expect("should compile")
});

static LIMIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bLIMIT\s+(\d+)(?:\s*,\s*(\d+)|\s+OFFSET\s+(\d+))?\s*;?\s*$")
        .expect("should compile")
});

static FROM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFROM\b").expect("should compile"));

/// Words that can follow `FROM`/`UNION` without being a table name.
fn is_reserved(word: &str) -> bool {
    ["SELECT", "ALL", "DISTINCT"]
        .iter()
        .any(|v| v.eq_ignore_ascii_case(word))
}

/// Inserts `prefix` in front of every table name the statement mentions.
///
/// ```
/// # use quarry_core::sql::prefix_tables;
/// assert_eq!(
///     prefix_tables("SELECT * FROM `user` JOIN post ON post.user_id = user.id", "app_"),
///     "SELECT * FROM `app_user` JOIN app_post ON post.user_id = user.id",
/// );
/// ```
pub fn prefix_tables<'s>(sql: &'s str, prefix: &str) -> Cow<'s, str> {
    if prefix.is_empty() {
        return Cow::Borrowed(sql);
    }
    PREFIX_REGEX.replace_all(sql, |caps: &Captures| {
        let whole = &caps[0];
        let keyword = &caps[2];
        let quoted = !caps[4].is_empty();
        if caps.get(1).is_some() && keyword.eq_ignore_ascii_case("UPDATE") {
            // ON DUPLICATE KEY UPDATE, FOR UPDATE
            return whole.to_owned();
        }
        if !quoted && is_reserved(&caps[5]) {
            return whole.to_owned();
        }
        format!(
            "{}{keyword}{}{}{prefix}{}",
            caps.get(1).map_or("", |v| v.as_str()),
            &caps[3],
            &caps[4],
            &caps[5],
        )
    })
}

/// Table names following `FROM`, `JOIN` and `UNION`, in order of appearance and without
/// repetitions.
pub fn parse_referenced_tables(sql: &str) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for caps in TABLES_REGEX.captures_iter(sql) {
        let name = &caps[2];
        if caps[1].is_empty() && is_reserved(name) {
            continue;
        }
        if !result.iter().any(|v| v == name) {
            result.push(name.to_owned());
        }
    }
    result
}

/// A trailing `LIMIT` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: Option<u64>,
    pub range: u64,
}

/// Reads a trailing `LIMIT n`, `LIMIT offset, n` or `LIMIT n OFFSET offset`.
pub fn parse_pagination(sql: &str) -> Option<Limit> {
    let caps = LIMIT_REGEX.captures(sql)?;
    let first = caps[1].parse().ok()?;
    Some(match (caps.get(2), caps.get(3)) {
        (Some(range), _) => Limit {
            offset: Some(first),
            range: range.as_str().parse().ok()?,
        },
        (None, Some(offset)) => Limit {
            offset: Some(offset.as_str().parse().ok()?),
            range: first,
        },
        (None, None) => Limit {
            offset: None,
            range: first,
        },
    })
}

/// `SELECT COUNT(*)` over everything between the first `FROM` and the trailing `LIMIT`.
///
/// Returns `None` unless the statement has both.
pub fn count_query(sql: &str) -> Option<String> {
    let limit = LIMIT_REGEX.find(sql)?;
    let from = FROM_REGEX.find(&sql[..limit.start()])?;
    let clause = sql[from.end()..limit.start()].trim();
    if clause.is_empty() {
        return None;
    }
    Some(format!("SELECT COUNT(*) FROM {clause}"))
}

pub fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|v| v.eq_ignore_ascii_case("INSERT"))
}

pub fn write_identifier_quoted(out: &mut String, value: &str) {
    out.push('`');
    out.push_str(&value.replace('`', "``"));
    out.push('`');
}

pub fn describe(table: &str) -> String {
    let mut out = String::from("DESCRIBE ");
    write_identifier_quoted(&mut out, table);
    out
}

/// `INSERT INTO table (a, b) VALUES (?, ?)`
pub fn write_insert<'a>(table: &str, columns: impl IntoIterator<Item = &'a str> + Clone) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("INSERT INTO ");
    write_identifier_quoted(&mut out, table);
    out.push_str(" (");
    separated_by(
        &mut out,
        columns.clone(),
        |out, v| write_identifier_quoted(out, v),
        ", ",
    );
    out.push_str(") VALUES (");
    separated_by(&mut out, columns, |out, _| out.push('?'), ", ");
    out.push(')');
    out
}

/// `UPDATE table SET a = ?, b = ? WHERE key = ?`
pub fn write_update<'a>(
    table: &str,
    columns: impl IntoIterator<Item = &'a str>,
    primary_key: &str,
) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("UPDATE ");
    write_identifier_quoted(&mut out, table);
    out.push_str(" SET ");
    separated_by(
        &mut out,
        columns,
        |out, v| {
            write_identifier_quoted(out, v);
            out.push_str(" = ?");
        },
        ", ",
    );
    out.push_str(" WHERE ");
    write_identifier_quoted(&mut out, primary_key);
    out.push_str(" = ?");
    out
}

/// `DELETE FROM table WHERE key = ?`
pub fn write_delete(table: &str, primary_key: &str) -> String {
    let mut out = String::with_capacity(64);
    out.push_str("DELETE FROM ");
    write_identifier_quoted(&mut out, table);
    out.push_str(" WHERE ");
    write_identifier_quoted(&mut out, primary_key);
    out.push_str(" = ?");
    out
}
