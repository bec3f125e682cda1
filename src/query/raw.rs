//! Named-parameter rewriting for raw statements.

use std::collections::HashSet;

use sea_query::Value;

use crate::error::{QuarryError, Result};

/// Replace every `:name` reference in `sql` with the dialect placeholder for
/// its position, returning the rewritten text and the values in order.
///
/// Quoted text (`'..'`, `".."`, `` `..` ``), comments (`--` to end of line,
/// `/* .. */`) and `::` are copied verbatim.
pub(crate) fn rewrite_named<F>(
    sql: &str,
    bindings: &[(String, Value)],
    placeholder: F,
) -> Result<(String, Vec<Value>)>
where
    F: Fn(usize) -> String,
{
    let mut out = String::with_capacity(sql.len());
    let mut params = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();
    // closing delimiter and the output offset where the verbatim body starts
    let mut verbatim: Option<(&str, usize)> = None;
    let mut chars = sql.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if let Some((close, body)) = verbatim {
            out.push(c);
            if out[body..].ends_with(close) {
                verbatim = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                let close = match c {
                    '\'' => "'",
                    '"' => "\"",
                    _ => "`",
                };
                verbatim = Some((close, out.len()));
            }
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                chars.next();
                out.push_str("--");
                verbatim = Some(("\n", out.len()));
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                out.push_str("/*");
                verbatim = Some(("*/", out.len()));
            }
            ':' => match chars.peek().copied() {
                Some((_, ':')) => {
                    chars.next();
                    out.push_str("::");
                }
                Some((start, next)) if next.is_ascii_alphabetic() || next == '_' => {
                    let mut end = start;
                    while let Some(&(i, ch)) = chars.peek() {
                        if ch.is_ascii_alphanumeric() || ch == '_' {
                            end = i + ch.len_utf8();
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let name = &sql[start..end];
                    let (bound, value) = bindings
                        .iter()
                        .find(|(n, _)| n == name)
                        .ok_or_else(|| {
                            QuarryError::QueryBuild(format!("parameter :{name} is not bound"))
                        })?;
                    used.insert(bound.as_str());
                    params.push(value.clone());
                    out.push_str(&placeholder(params.len()));
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }

    if let Some((name, _)) = bindings.iter().find(|(n, _)| !used.contains(n.as_str())) {
        return Err(QuarryError::QueryBuild(format!(
            "parameter :{name} is bound but never referenced"
        )));
    }
    Ok((out, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollar(position: usize) -> String {
        format!("${position}")
    }

    #[test]
    fn test_rewrites_in_order() {
        let bindings = vec![
            ("name".to_string(), Value::from("Ana")),
            ("id".to_string(), Value::from(1)),
        ];
        let (sql, params) = rewrite_named(
            "UPDATE person SET name = :name WHERE id = :id",
            &bindings,
            dollar,
        )
        .unwrap();
        assert_eq!(sql, "UPDATE person SET name = $1 WHERE id = $2");
        assert_eq!(params, vec![Value::from("Ana"), Value::from(1)]);
    }

    #[test]
    fn test_skips_casts_and_literals() {
        let bindings = vec![("v".to_string(), Value::from(1))];
        let (sql, params) = rewrite_named(
            "SELECT ':not', :v::text, \"a:b\"",
            &bindings,
            |_| "?".to_string(),
        )
        .unwrap();
        assert_eq!(sql, "SELECT ':not', ?::text, \"a:b\"");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_skips_comments() {
        let bindings = vec![("id".to_string(), Value::from(7))];
        let (sql, params) = rewrite_named(
            "SELECT id FROM invoice -- don't touch :gone\nWHERE id = :id /* it's :x */",
            &bindings,
            dollar,
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT id FROM invoice -- don't touch :gone\nWHERE id = $1 /* it's :x */"
        );
        assert_eq!(params, vec![Value::from(7)]);

        let (sql, _) =
            rewrite_named("SELECT 5 - -:id /*/ :no */", &bindings, dollar).unwrap();
        assert_eq!(sql, "SELECT 5 - -$1 /*/ :no */");
    }

    #[test]
    fn test_unbound_and_unused_are_errors() {
        let err = rewrite_named("SELECT :missing", &[], dollar).unwrap_err();
        assert!(matches!(err, QuarryError::QueryBuild(msg) if msg.contains("missing")));

        let bindings = vec![("extra".to_string(), Value::from(1))];
        let err = rewrite_named("SELECT 1", &bindings, dollar).unwrap_err();
        assert!(matches!(err, QuarryError::QueryBuild(msg) if msg.contains("extra")));
    }

    #[test]
    fn test_repeated_name_binds_each_occurrence() {
        let bindings = vec![("x".to_string(), Value::from(5))];
        let (sql, params) =
            rewrite_named("SELECT :x + :x", &bindings, |_| "?".to_string()).unwrap();
        assert_eq!(sql, "SELECT ? + ?");
        assert_eq!(params.len(), 2);
    }
}
