//! S-expression reader for KiCad library files
//!
//! Produces a plain tree of [`Sexpr`] nodes and offers a small path based
//! query API on top of it. Paths are `/`-separated list names, where a
//! segment of the form `@N` selects the N-th argument of a list (the list
//! name itself is not counted):
//!
//! ```
//! let root = kicadimport_sexpr::parse("(pad \"1\" smd rect (at 1.5 -2 90))").unwrap();
//! assert_eq!(root.child("@0").unwrap().value().unwrap(), "1");
//! assert_eq!(root.child("at/@2").unwrap().deserialize::<f64>().unwrap(), 90.0);
//! ```

mod parser;

use std::fmt;

pub use parser::parse;

/// Errors raised while reading or querying an s-expression tree
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SexprError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("node '{node}' has no child '{path}'")]
    MissingChild { node: String, path: String },

    #[error("node '{node}' is not a value")]
    NotAValue { node: String },

    #[error("invalid {expected} value: '{value}'")]
    InvalidValue { value: String, expected: &'static str },
}

pub type Result<T> = std::result::Result<T, SexprError>;

/// One node of an s-expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    /// Unquoted token, including numbers (e.g. `smd`, `1.27`, `F.Cu`)
    Symbol(String),
    /// Quoted string with escapes resolved
    String(String),
    /// Parenthesized list; the first item is usually the list name
    List(Vec<Sexpr>),
}

impl Sexpr {
    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match self {
            Sexpr::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sym(&self) -> Option<&str> {
        match self {
            Sexpr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Sexpr::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        self.as_sym().and_then(|s| s.parse().ok())
    }

    pub fn as_float(&self) -> Option<f64> {
        self.as_sym().and_then(|s| s.parse().ok())
    }

    /// Name of a list node, i.e. its leading symbol
    pub fn name(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(|s| s.as_sym())
    }

    /// Check whether this is a list with the given name
    pub fn is_named(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    /// All children after the list name (empty for leaf nodes)
    pub fn args(&self) -> &[Sexpr] {
        match self {
            Sexpr::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// Child list nodes, skipping plain values
    pub fn lists(&self) -> impl Iterator<Item = &Sexpr> {
        self.args().iter().filter(|c| c.as_list().is_some())
    }

    /// Child lists with the given name
    pub fn children_named<'a, 'n>(&'a self, name: &'n str) -> ChildrenNamed<'a, 'n> {
        ChildrenNamed {
            children: self.args().iter(),
            name,
        }
    }

    /// Check whether a bare token appears as a direct argument
    pub fn contains_token(&self, token: &str) -> bool {
        self.args().iter().any(|c| c.as_sym() == Some(token))
    }

    /// Text of a leaf node (symbol or string)
    pub fn value(&self) -> Result<&str> {
        match self {
            Sexpr::Symbol(s) | Sexpr::String(s) => Ok(s),
            Sexpr::List(_) => Err(SexprError::NotAValue {
                node: self.display_name(),
            }),
        }
    }

    /// Typed accessor for leaf nodes
    pub fn deserialize<T: FromSexpr>(&self) -> Result<T> {
        T::from_sexpr(self)
    }

    /// Resolve a child path, failing if any segment is missing
    pub fn child(&self, path: &str) -> Result<&Sexpr> {
        self.try_child(path).ok_or_else(|| SexprError::MissingChild {
            node: self.display_name(),
            path: path.to_string(),
        })
    }

    /// Resolve a child path, returning `None` if any segment is missing
    pub fn try_child<'a>(&'a self, path: &str) -> Option<&'a Sexpr> {
        let mut node = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = match segment.strip_prefix('@') {
                Some(index) => node.args().get(index.parse::<usize>().ok()?)?,
                None => node.children_named(segment).next()?,
            };
        }
        Some(node)
    }

    fn display_name(&self) -> String {
        match self {
            Sexpr::List(_) => self.name().unwrap_or("<list>").to_string(),
            Sexpr::Symbol(s) | Sexpr::String(s) => s.clone(),
        }
    }
}

/// Iterator over the child lists with a given name
///
/// The nodes borrow from the tree only, not from the name.
#[derive(Debug, Clone)]
pub struct ChildrenNamed<'a, 'n> {
    children: std::slice::Iter<'a, Sexpr>,
    name: &'n str,
}

impl<'a> Iterator for ChildrenNamed<'a, '_> {
    type Item = &'a Sexpr;

    fn next(&mut self) -> Option<&'a Sexpr> {
        let name = self.name;
        self.children.find(|c| c.is_named(name))
    }
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexpr::Symbol(s) => write!(f, "{}", s),
            Sexpr::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Sexpr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Conversion from a leaf node into a typed value
pub trait FromSexpr: Sized {
    fn from_sexpr(node: &Sexpr) -> Result<Self>;
}

impl FromSexpr for String {
    fn from_sexpr(node: &Sexpr) -> Result<Self> {
        node.value().map(str::to_string)
    }
}

impl FromSexpr for f64 {
    fn from_sexpr(node: &Sexpr) -> Result<Self> {
        let value = node.value()?;
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| SexprError::InvalidValue {
                value: value.to_string(),
                expected: "number",
            })
    }
}

impl FromSexpr for i64 {
    fn from_sexpr(node: &Sexpr) -> Result<Self> {
        let value = node.value()?;
        value.trim().parse().map_err(|_| SexprError::InvalidValue {
            value: value.to_string(),
            expected: "integer",
        })
    }
}

impl FromSexpr for i32 {
    fn from_sexpr(node: &Sexpr) -> Result<Self> {
        let v = i64::from_sexpr(node)?;
        i32::try_from(v).map_err(|_| SexprError::InvalidValue {
            value: v.to_string(),
            expected: "32-bit integer",
        })
    }
}

/// KiCad booleans are written as `yes`/`no` (older files use `true`/`false`)
impl FromSexpr for bool {
    fn from_sexpr(node: &Sexpr) -> Result<Self> {
        match node.value()? {
            "yes" | "true" => Ok(true),
            "no" | "false" => Ok(false),
            other => Err(SexprError::InvalidValue {
                value: other.to_string(),
                expected: "boolean",
            }),
        }
    }
}
