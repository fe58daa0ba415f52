//! Identity extraction for descriptor elements.
//!
//! An [`Identifier`] turns an element into the key used to recognise "the
//! same logical item" in another document, e.g. a `<servlet>` is identified
//! by the text of its `<servlet-name>` child.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::node::Element;

/// Signature of a custom key extractor.
pub type ExtractFn = dyn Fn(&Element) -> Option<String> + Send + Sync;

/// A per-tag key extraction rule.
#[derive(Clone)]
pub enum Identifier {
    /// Text of the child element at a `/`-separated path.
    ChildText(String),
    /// Value of an attribute on the element itself.
    Attribute(String),
    /// Concatenation of child texts and literals.
    Concat(Vec<IdentifierPart>),
    /// Arbitrary extraction function.
    Custom(Arc<ExtractFn>),
}

/// One operand of an [`Identifier::Concat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierPart {
    /// Text of the child element at a path, empty when absent.
    Child(String),
    /// A literal string.
    Literal(String),
}

impl Identifier {
    /// Identifier reading the text of a child element.
    pub fn child(path: impl Into<String>) -> Self {
        Identifier::ChildText(path.into())
    }

    /// Identifier reading an attribute.
    pub fn attribute(name: impl Into<String>) -> Self {
        Identifier::Attribute(name.into())
    }

    /// Identifier backed by a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Element) -> Option<String> + Send + Sync + 'static,
    {
        Identifier::Custom(Arc::new(f))
    }

    /// Parses an identifier expression.
    ///
    /// Accepted forms are a child path (`servlet-name`, `web/web-uri`), an
    /// attribute (`@name`) and a concatenation
    /// (`concat(error-code,'>',exception-type)`).
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        if let Some(name) = expr.strip_prefix('@') {
            validate_name(name, expr)?;
            return Ok(Identifier::Attribute(name.to_string()));
        }
        if let Some(args) = expr
            .strip_prefix("concat(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts = split_args(args, expr)?
                .into_iter()
                .map(|arg| parse_part(&arg, expr))
                .collect::<Result<Vec<_>>>()?;
            if parts.is_empty() {
                return Err(invalid(expr));
            }
            return Ok(Identifier::Concat(parts));
        }
        validate_path(expr)?;
        Ok(Identifier::ChildText(expr.to_string()))
    }

    /// Extracts the key of an element.
    ///
    /// Returns `None` when the key source is missing; such elements never
    /// match anything.
    pub fn extract(&self, element: &Element) -> Option<String> {
        match self {
            Identifier::ChildText(path) => element.text_at(path),
            Identifier::Attribute(name) => element.attribute(name).map(str::to_string),
            Identifier::Concat(parts) => {
                let mut key = String::new();
                let mut found_child = false;
                let mut has_child = false;
                for part in parts {
                    match part {
                        IdentifierPart::Child(path) => {
                            has_child = true;
                            if let Some(text) = element.text_at(path) {
                                found_child = true;
                                key.push_str(&text);
                            }
                        }
                        IdentifierPart::Literal(literal) => key.push_str(literal),
                    }
                }
                // A key made of literals alone says nothing about the element
                (found_child || !has_child).then_some(key)
            }
            Identifier::Custom(f) => f(element),
        }
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::ChildText(path) => f.debug_tuple("ChildText").field(path).finish(),
            Identifier::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            Identifier::Concat(parts) => f.debug_tuple("Concat").field(parts).finish(),
            Identifier::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Identifier::parse(s)
    }
}

fn invalid(expr: &str) -> Error {
    Error::Config(format!("invalid identifier expression '{}'", expr))
}

fn validate_name(name: &str, expr: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if valid {
        Ok(())
    } else {
        Err(invalid(expr))
    }
}

fn validate_path(expr: &str) -> Result<()> {
    if expr.is_empty() {
        return Err(invalid(expr));
    }
    expr.split('/').try_for_each(|step| validate_name(step, expr))
}

/// Splits `concat` arguments on commas that are not inside quotes.
fn split_args(args: &str, expr: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in args.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (None, ',') => parts.push(std::mem::take(&mut current)),
            (None, c) => current.push(c),
        }
    }
    if quote.is_some() {
        return Err(invalid(expr));
    }
    parts.push(current);
    Ok(parts)
}

fn parse_part(arg: &str, expr: &str) -> Result<IdentifierPart> {
    let arg = arg.trim();
    for q in ['\'', '"'] {
        if let Some(inner) = arg.strip_prefix(q).and_then(|a| a.strip_suffix(q)) {
            return Ok(IdentifierPart::Literal(inner.to_string()));
        }
    }
    validate_path(arg).map_err(|_| invalid(expr))?;
    Ok(IdentifierPart::Child(arg.to_string()))
}
