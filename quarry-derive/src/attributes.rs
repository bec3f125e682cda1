//! Attribute parsing utilities

use syn::{Attribute, Expr, ExprLit, Field, Lit, LitStr};

/// How a field is populated
pub enum FieldBinding {
    Column {
        column: String,
        primary_key: bool,
        auto_increment: bool,
        null_default: Option<Expr>,
    },
    Relation {
        local: String,
        foreign: String,
    },
    Unbound,
}

/// Read a `name = "value"` attribute as a string literal
fn string_value(attr: &Attribute) -> syn::Result<LitStr> {
    let meta = attr.meta.require_name_value()?;
    match &meta.value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.clone()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

/// Extract table name from struct attributes
pub fn extract_table_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    for attr in attrs {
        if attr.path().is_ident("table_name") {
            return Ok(Some(string_value(attr)?.value()));
        }
    }
    Ok(None)
}

/// Parse the binding of one named field
pub fn parse_field(field: &Field, member: &str) -> syn::Result<FieldBinding> {
    let mut column = None;
    let mut primary_key = false;
    let mut auto_increment = false;
    let mut null_default = None;
    let mut relation = None;
    let mut ignored = false;

    for attr in &field.attrs {
        let path = attr.path();
        if path.is_ident("column_name") {
            column = Some(string_value(attr)?.value());
        } else if path.is_ident("primary_key") {
            attr.meta.require_path_only()?;
            primary_key = true;
        } else if path.is_ident("auto_increment") {
            attr.meta.require_path_only()?;
            auto_increment = true;
        } else if path.is_ident("null_default") {
            null_default = Some(string_value(attr)?.parse::<Expr>()?);
        } else if path.is_ident("skip") {
            attr.meta.require_path_only()?;
            ignored = true;
        } else if path.is_ident("relation") {
            relation = Some(parse_relation(attr)?);
        }
    }

    if ignored {
        return Ok(FieldBinding::Unbound);
    }
    if let Some((local, foreign)) = relation {
        if column.is_some() || primary_key || auto_increment || null_default.is_some() {
            return Err(syn::Error::new_spanned(
                field,
                "a relation field cannot carry column attributes",
            ));
        }
        return Ok(FieldBinding::Relation { local, foreign });
    }
    Ok(FieldBinding::Column {
        column: column.unwrap_or_else(|| member.to_string()),
        primary_key,
        auto_increment,
        null_default,
    })
}

/// `#[relation(local = "id", foreign = "owner_id")]`
fn parse_relation(attr: &Attribute) -> syn::Result<(String, String)> {
    let mut local = None;
    let mut foreign = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("local") {
            local = Some(meta.value()?.parse::<LitStr>()?.value());
            Ok(())
        } else if meta.path.is_ident("foreign") {
            foreign = Some(meta.value()?.parse::<LitStr>()?.value());
            Ok(())
        } else {
            Err(meta.error("expected `local` or `foreign`"))
        }
    })?;
    match (local, foreign) {
        (Some(local), Some(foreign)) => Ok((local, foreign)),
        _ => Err(syn::Error::new_spanned(
            attr,
            "relation requires both `local` and `foreign` columns",
        )),
    }
}
