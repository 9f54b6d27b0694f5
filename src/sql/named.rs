//! Named placeholders (`:name`) compiled to PostgreSQL positional ones (`$n`).

use super::params::PgBindValue;
use crate::error::AppError;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Named bind values for one statement.
#[derive(Clone, Debug, Default)]
pub struct NamedArgs {
    values: BTreeMap<String, PgBindValue>,
}

impl NamedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, name: &str, value: impl Into<PgBindValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&PgBindValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Source of named arguments: a record, a JSON mapping, or nothing.
pub trait ToNamedArgs {
    fn to_named_args(&self) -> NamedArgs;
}

impl ToNamedArgs for NamedArgs {
    fn to_named_args(&self) -> NamedArgs {
        self.clone()
    }
}

impl ToNamedArgs for () {
    fn to_named_args(&self) -> NamedArgs {
        NamedArgs::new()
    }
}

impl ToNamedArgs for serde_json::Map<String, Value> {
    fn to_named_args(&self) -> NamedArgs {
        self.iter().fold(NamedArgs::new(), |args, (k, v)| {
            args.add(k, PgBindValue::from_json(v))
        })
    }
}

/// A statement with its named placeholders rewritten to `$n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedQuery {
    pub sql: String,
    names: Vec<String>,
}

impl NamedQuery {
    /// Rewrite `:name` to `$n`. A name used twice keeps one position. Casts
    /// (`::type`) and quoted literals or identifiers are copied unchanged.
    pub fn parse(query: &str) -> Self {
        let chars: Vec<char> = query.chars().collect();
        let mut sql = String::with_capacity(query.len());
        let mut names: Vec<String> = Vec::new();
        let mut i = 0;
        while let Some(&c) = chars.get(i) {
            match c {
                '\'' | '"' => {
                    sql.push(c);
                    i += 1;
                    while let Some(&ch) = chars.get(i) {
                        sql.push(ch);
                        i += 1;
                        if ch == c {
                            // doubled quote is an escaped quote
                            if chars.get(i) == Some(&c) {
                                sql.push(c);
                                i += 1;
                                continue;
                            }
                            break;
                        }
                    }
                }
                ':' if chars.get(i + 1) == Some(&':') => {
                    sql.push_str("::");
                    i += 2;
                }
                ':' if chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') => {
                    let start = i + 1;
                    let mut end = start;
                    while chars
                        .get(end)
                        .is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_')
                    {
                        end += 1;
                    }
                    let name: String = chars.get(start..end).unwrap_or_default().iter().collect();
                    let pos = match names.iter().position(|n| *n == name) {
                        Some(p) => p,
                        None => {
                            names.push(name);
                            names.len() - 1
                        }
                    };
                    sql.push_str(&format!("${}", pos + 1));
                    i = end;
                }
                _ => {
                    sql.push(c);
                    i += 1;
                }
            }
        }
        NamedQuery { sql, names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Positional values in placeholder order. Fails before any I/O when a
    /// placeholder has no value.
    pub fn bind(&self, args: &NamedArgs) -> Result<Vec<PgBindValue>, AppError> {
        self.names
            .iter()
            .map(|name| {
                args.get(name)
                    .cloned()
                    .ok_or_else(|| AppError::Internal(format!("missing named argument :{name}")))
            })
            .collect()
    }

    /// Statement with values substituted and whitespace collapsed, for logs.
    pub fn render(&self, values: &[PgBindValue]) -> String {
        static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
        static SPACES: OnceLock<Option<Regex>> = OnceLock::new();
        let mut out = self.sql.clone();
        if let Some(re) = PLACEHOLDER.get_or_init(|| Regex::new(r"\$(\d+)").ok()) {
            out = re
                .replace_all(&out, |caps: &regex::Captures<'_>| {
                    caps.get(1)
                        .and_then(|m| m.as_str().parse::<usize>().ok())
                        .and_then(|n| values.get(n.wrapping_sub(1)))
                        .map(ToString::to_string)
                        .unwrap_or_else(|| {
                            caps.get(0).map(|m| m.as_str()).unwrap_or("").to_string()
                        })
                })
                .into_owned();
        }
        if let Some(re) = SPACES.get_or_init(|| Regex::new(r"\s\s+").ok()) {
            out = re.replace_all(&out, " ").into_owned();
        }
        out.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_names_in_order() {
        let q = NamedQuery::parse("INSERT INTO t (a, b) VALUES (:a, :b)");
        assert_eq!(q.sql, "INSERT INTO t (a, b) VALUES ($1, $2)");
        assert_eq!(q.names(), ["a", "b"]);
    }

    #[test]
    fn repeated_name_reuses_position() {
        let q = NamedQuery::parse("SELECT 1 WHERE x = :id OR y = :id AND z = :other");
        assert_eq!(q.sql, "SELECT 1 WHERE x = $1 OR y = $1 AND z = $2");
    }

    #[test]
    fn casts_and_literals_untouched() {
        let q = NamedQuery::parse(
            "SELECT ':skip', \"a:b\", created_on::text FROM t WHERE id = :id::bigint",
        );
        assert_eq!(
            q.sql,
            "SELECT ':skip', \"a:b\", created_on::text FROM t WHERE id = $1::bigint"
        );
        assert_eq!(q.names(), ["id"]);
    }

    #[test]
    fn escaped_quote_inside_literal() {
        let q = NamedQuery::parse("SELECT 'it''s :x' WHERE a = :a");
        assert_eq!(q.sql, "SELECT 'it''s :x' WHERE a = $1");
    }

    #[test]
    fn bind_reports_missing_argument() {
        let q = NamedQuery::parse("SELECT * FROM t WHERE id = :id AND alias = :alias");
        let args = NamedArgs::new().add("id", 3_i64);
        let err = q.bind(&args).unwrap_err();
        assert!(err.to_string().contains(":alias"));
    }

    #[test]
    fn render_substitutes_and_collapses() {
        let q = NamedQuery::parse("SELECT *\n   FROM t\n  WHERE label = :label AND id = :id");
        let args = NamedArgs::new().add("label", "a'b").add("id", 10_i64);
        let values = q.bind(&args).unwrap();
        assert_eq!(q.render(&values), "SELECT * FROM t WHERE label = 'a''b' AND id = 10");
    }

    #[test]
    fn json_map_is_an_argument_source() {
        let map = serde_json::json!({"id": 1, "name": "x"});
        let args = map.as_object().unwrap().to_named_args();
        assert_eq!(args.len(), 2);
    }
}
