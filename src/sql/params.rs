//! Values that can be bound to a PostgreSQL statement.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};
use std::fmt;

/// A typed bind value. Each variant reports its real PostgreSQL type so the
/// server never has to guess from text.
#[derive(Clone, Debug)]
pub enum PgBindValue {
    Null(PgTypeInfo),
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Json(Value),
}

impl PgBindValue {
    /// Convert a JSON value. Nested arrays and objects bind as JSONB.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null(<String as Type<Postgres>>::type_info()),
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PgBindValue::I64(i)
                } else {
                    PgBindValue::F64(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }

    fn type_of(&self) -> PgTypeInfo {
        match self {
            PgBindValue::Null(t) => t.clone(),
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Uuid(_) => <uuid::Uuid as Type<Postgres>>::type_info(),
            PgBindValue::Timestamp(_) => {
                <chrono::DateTime<chrono::Utc> as Type<Postgres>>::type_info()
            }
            PgBindValue::Json(_) => <Value as Type<Postgres>>::type_info(),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null(_) => IsNull::Yes,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            PgBindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
            PgBindValue::Timestamp(t) => {
                <chrono::DateTime<chrono::Utc> as Encode<Postgres>>::encode_by_ref(t, buf)?
            }
            PgBindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(self.type_of())
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}

/// SQL-literal rendering, used only for statement logging.
impl fmt::Display for PgBindValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgBindValue::Null(_) => f.write_str("NULL"),
            PgBindValue::Bool(b) => write!(f, "{b}"),
            PgBindValue::I64(n) => write!(f, "{n}"),
            PgBindValue::F64(n) => write!(f, "{n}"),
            PgBindValue::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            PgBindValue::Uuid(u) => write!(f, "'{u}'"),
            PgBindValue::Timestamp(t) => write!(f, "'{}'", t.to_rfc3339()),
            PgBindValue::Json(v) => write!(f, "'{v}'"),
        }
    }
}

impl From<bool> for PgBindValue {
    fn from(v: bool) -> Self {
        PgBindValue::Bool(v)
    }
}

impl From<i32> for PgBindValue {
    fn from(v: i32) -> Self {
        PgBindValue::I64(v.into())
    }
}

impl From<i64> for PgBindValue {
    fn from(v: i64) -> Self {
        PgBindValue::I64(v)
    }
}

impl From<f64> for PgBindValue {
    fn from(v: f64) -> Self {
        PgBindValue::F64(v)
    }
}

impl From<String> for PgBindValue {
    fn from(v: String) -> Self {
        PgBindValue::String(v)
    }
}

impl From<&str> for PgBindValue {
    fn from(v: &str) -> Self {
        PgBindValue::String(v.to_string())
    }
}

impl From<uuid::Uuid> for PgBindValue {
    fn from(v: uuid::Uuid) -> Self {
        PgBindValue::Uuid(v)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for PgBindValue {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        PgBindValue::Timestamp(v)
    }
}

impl From<Value> for PgBindValue {
    fn from(v: Value) -> Self {
        PgBindValue::from_json(&v)
    }
}

impl<T> From<Option<T>> for PgBindValue
where
    T: Into<PgBindValue> + Type<Postgres>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => PgBindValue::Null(T::type_info()),
        }
    }
}
