//! Template Expander: `{{name}}` / `{{name(arg1,arg2,...)}}` substitution
//! against a fixed function library (`functions`).
mod functions;
mod random;

use crate::error::TemplateError;

pub use random::seed as seed_random;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Expr { name: String, args: Vec<String> },
}

/// A template parsed once and expandable many times (once per request).
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parses `source` into segments, validating brace/paren/quote balance
    /// up front so malformed templates fail before any request is sent.
    ///
    /// # Errors
    ///
    /// Returns a `TemplateError` when braces are unterminated, an
    /// expression is empty, or an argument list is malformed.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let bytes: Vec<char> = source.chars().collect();
        let mut i = 0_usize;
        while let Some(&ch) = bytes.get(i) {
            if ch == '{' && bytes.get(i.saturating_add(1)) == Some(&'{') {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let start = i;
                i = i.saturating_add(2);
                let expr_start = i;
                let mut depth = 1_u32;
                while let Some(&inner) = bytes.get(i) {
                    if inner == '{' && bytes.get(i.saturating_add(1)) == Some(&'{') {
                        depth = depth.saturating_add(1);
                        i = i.saturating_add(2);
                        continue;
                    }
                    if inner == '}' && bytes.get(i.saturating_add(1)) == Some(&'}') {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            break;
                        }
                        i = i.saturating_add(2);
                        continue;
                    }
                    i = i.saturating_add(1);
                }
                if i >= bytes.len() {
                    return Err(TemplateError::UnterminatedExpression { pos: start });
                }
                let expr: String = bytes.get(expr_start..i).unwrap_or_default().iter().collect();
                i = i.saturating_add(2);
                segments.push(parse_expr(&expr)?);
                continue;
            }
            literal.push(ch);
            i = i.saturating_add(1);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Expands the template, calling into the function library for every
    /// `Expr` segment.
    ///
    /// # Errors
    ///
    /// Returns a `TemplateError` if a function call fails or an unknown
    /// function is referenced (only possible if the library changed since
    /// `parse`).
    pub fn expand(&self) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expr { name, args } => {
                    let mut resolved = Vec::with_capacity(args.len());
                    for arg in args {
                        resolved.push(if is_nested_call(arg) {
                            let nested = parse_expr(arg)?;
                            match nested {
                                Segment::Expr { name, args } => functions::call(&name, &args)?,
                                Segment::Literal(text) => text,
                            }
                        } else {
                            unquote(arg)
                        });
                    }
                    out.push_str(&functions::call(name, &resolved)?);
                }
            }
        }
        Ok(out)
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        !self
            .segments
            .iter()
            .any(|segment| matches!(segment, Segment::Expr { .. }))
    }
}

fn is_nested_call(arg: &str) -> bool {
    let trimmed = arg.trim();
    trimmed.contains('(') && trimmed.ends_with(')')
}

fn unquote(arg: &str) -> String {
    let trimmed = arg.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        trimmed
            .get(1..trimmed.len().saturating_sub(1))
            .unwrap_or(trimmed)
            .to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn parse_expr(expr: &str) -> Result<Segment, TemplateError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(TemplateError::EmptyExpression);
    }
    let Some(paren) = trimmed.find('(') else {
        return Ok(Segment::Expr {
            name: trimmed.to_owned(),
            args: Vec::new(),
        });
    };
    let name = trimmed.get(..paren).unwrap_or(trimmed).trim().to_owned();
    if !trimmed.ends_with(')') {
        return Err(TemplateError::UnterminatedArgs { name });
    }
    let inner = trimmed
        .get(paren.saturating_add(1)..trimmed.len().saturating_sub(1))
        .unwrap_or("");
    let args = split_args(inner).map_err(|()| TemplateError::UnterminatedArgs { name: name.clone() })?;
    Ok(Segment::Expr { name, args })
}

fn split_args(inner: &str) -> Result<Vec<String>, ()> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    for ch in inner.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '(' => {
                    depth = depth.saturating_add(1);
                    current.push(ch);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(ch);
                }
                ',' if depth == 0 => {
                    args.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            },
        }
    }
    if quote.is_some() || depth != 0 {
        return Err(());
    }
    args.push(current);
    Ok(args.into_iter().map(|arg| arg.trim().to_owned()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_only_template_round_trips() {
        let template = Template::parse("hello world").unwrap();
        assert_eq!(template.expand().unwrap(), "hello world");
        assert!(template.is_static());
    }

    #[test]
    fn zero_arg_function_expands() {
        let template = Template::parse("id={{UUID}}").unwrap();
        let out = template.expand().unwrap();
        assert!(out.starts_with("id="));
        assert!(!template.is_static());
    }

    #[test]
    fn call_with_arguments_expands() {
        let template = Template::parse("{{upper(hello)}}").unwrap();
        assert_eq!(template.expand().unwrap(), "HELLO");
    }

    #[test]
    fn args_with_commas_inside_quotes_are_preserved() {
        let template = Template::parse("{{join(\",\",a,b)}}").unwrap();
        assert_eq!(template.expand().unwrap(), "a,b");
    }

    #[test]
    fn unterminated_braces_are_rejected() {
        assert!(matches!(
            Template::parse("{{upper(hello)"),
            Err(TemplateError::UnterminatedExpression { .. })
        ));
    }

    #[test]
    fn unknown_function_is_rejected_on_expand() {
        let template = Template::parse("{{nope}}").unwrap();
        assert!(matches!(
            template.expand(),
            Err(TemplateError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn nested_call_is_evaluated_before_outer() {
        let template = Template::parse("{{upper(lower(HELLO))}}").unwrap();
        assert_eq!(template.expand().unwrap(), "HELLO");
    }
}
