//! Validated pagination and the ORDER BY / LIMIT / OFFSET clause built from it.

use crate::error::{AppError, FieldErrors};
use std::collections::HashMap;
use std::str::FromStr;

/// Quote identifier for PostgreSQL (safe: only from whitelists).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn token(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Asc),
            "desc" | "descending" => Ok(Direction::Desc),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PaginationConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            default_per_page: 20,
            max_per_page: 100,
        }
    }
}

/// Page request whose sort column is always one of the resource's sortable
/// columns; nothing else can reach the SQL text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    per_page: u32,
    sort: &'static str,
    direction: Direction,
}

impl Pagination {
    /// Build from query parameters `page`, `per_page`, `sort`, `direction`.
    /// Absent or empty values take defaults (page 1, configured page size,
    /// first sortable column, ascending); present but invalid values are
    /// rejected with per-field errors.
    pub fn from_query(
        params: &HashMap<String, String>,
        cfg: &PaginationConfig,
        sortable: &'static [&'static str],
    ) -> Result<Self, AppError> {
        let param = |k: &str| params.get(k).map(|s| s.trim()).filter(|s| !s.is_empty());
        let mut fe = FieldErrors::new();

        let page = match param("page") {
            None => 1,
            Some(s) => match s.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    fe.add("page", "must be a positive integer");
                    1
                }
            },
        };
        let per_page = match param("per_page") {
            None => cfg.default_per_page.clamp(1, cfg.max_per_page.max(1)),
            Some(s) => match s.parse::<u32>() {
                Ok(n) if n >= 1 && n <= cfg.max_per_page => n,
                Ok(n) if n > cfg.max_per_page => {
                    fe.add("per_page", format!("must be at most {}", cfg.max_per_page));
                    1
                }
                _ => {
                    fe.add("per_page", "must be a positive integer");
                    1
                }
            },
        };
        let default_sort = sortable.first().copied().unwrap_or("id");
        let sort = match param("sort") {
            None => default_sort,
            Some(s) => match sortable.iter().find(|c| **c == s) {
                Some(c) => *c,
                None => {
                    fe.add("sort", format!("must be one of: {}", sortable.join(", ")));
                    default_sort
                }
            },
        };
        let direction = match param("direction") {
            None => Direction::Asc,
            Some(s) => s.parse().unwrap_or_else(|_| {
                fe.add("direction", "must be asc or desc");
                Direction::Asc
            }),
        };
        fe.into_result()?;
        Ok(Pagination {
            page,
            per_page,
            sort,
            direction,
        })
    }

    /// Direct construction from already-trusted parts. The sort column is a
    /// `'static` token chosen by code, never by a caller.
    pub fn new(page: u32, per_page: u32, sort: &'static str, direction: Direction) -> Self {
        Pagination {
            page: page.max(1),
            per_page: per_page.max(1),
            sort,
            direction,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn sort(&self) -> &'static str {
        self.sort
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// ` ORDER BY "<sort>" <DIR>[, "id" <DIR>] LIMIT <n> OFFSET <m>`
    pub fn clause(&self) -> String {
        let dir = self.direction.token();
        let tiebreak = if self.sort == "id" {
            String::new()
        } else {
            format!(", {} {}", quoted("id"), dir)
        };
        format!(
            " ORDER BY {} {}{} LIMIT {} OFFSET {}",
            quoted(self.sort),
            dir,
            tiebreak,
            self.limit(),
            self.offset()
        )
    }

    /// Append the clause to a base SELECT.
    pub fn apply(&self, base: &str) -> String {
        format!("{}{}", base.trim_end(), self.clause())
    }
}
