use core::fmt::{self, Display, Write};

/// A parameter or literal value carried through a query.
///
/// Values bound to positional parameters keep their Rust-side representation
/// until the query-execution collaborator picks them up; literal values embed
/// directly into the rendered text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    /// Collection value, used for `IN` parameters.
    List(Vec<Value>),
}

impl Value {
    /// Writes the value as a query literal. Strings are single-quoted with
    /// embedded quotes doubled.
    pub fn write_literal(&self, buf: &mut impl Write) {
        match self {
            Value::Null => {
                let _ = buf.write_str("NULL");
            }
            Value::Bool(true) => {
                let _ = buf.write_str("TRUE");
            }
            Value::Bool(false) => {
                let _ = buf.write_str("FALSE");
            }
            Value::Int(n) => {
                let _ = write!(buf, "{n}");
            }
            Value::Real(n) => {
                let _ = write!(buf, "{n}");
            }
            Value::Text(s) => {
                let _ = buf.write_char('\'');
                for c in s.chars() {
                    if c == '\'' {
                        let _ = buf.write_str("''");
                    } else {
                        let _ = buf.write_char(c);
                    }
                }
                let _ = buf.write_char('\'');
            }
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        let _ = buf.write_str(", ");
                    }
                    item.write_literal(buf);
                }
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_literal(&mut out);
        f.write_str(&out)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
