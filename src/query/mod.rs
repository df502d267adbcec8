//! Query building over base records.
//!
//! A [`Query`] filters the records of one type. Base-column clauses compare
//! columns directly; translation clauses become `EXISTS` sub-queries against
//! the variant table, optionally scoped to one locale. Clauses are emitted
//! left to right with their connectors, so SQL precedence applies (AND binds
//! tighter than OR).
//!
//! Each translation filter comes in two spellings: an equality form taking
//! only a value, and an `_op` form taking an explicit [`Operator`].

pub mod predicate;

pub use predicate::{Clause, Connector, LocaleScope, Operator, Predicate};

use crate::core::record_type::LOCALE_COLUMN;
use crate::core::{LocaleContext, RecordType};
use crate::error::{Error, Result, StorageError};
use crate::storage::schema::quote_ident;
use serde_json::Value;
use std::fmt::Write;

/// Alias of the base table in generated SQL.
const BASE_ALIAS: &str = "b";

/// Alias of the variant table inside `EXISTS` sub-queries.
const VARIANT_ALIAS: &str = "t";

/// SQL text and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL with `?` placeholders.
    pub sql: String,
    /// Values bound to the placeholders, in order.
    pub params: Vec<Value>,
}

/// A filter over the records of one type.
///
/// # Examples
///
/// ```
/// use locale_overlay::core::{LocaleContext, RecordType};
/// use locale_overlay::query::Query;
///
/// let product = RecordType::builder("product")
///     .table("products")
///     .translatable(["name"])
///     .build()
///     .unwrap();
/// let ctx = LocaleContext::new("fr", "en");
/// let query = Query::new(&product, &ctx).where_translation("name", "Ordinateur", None);
/// let compiled = query.to_sql().unwrap();
/// assert!(compiled.sql.contains("EXISTS"));
/// assert_eq!(compiled.params.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Query<'t> {
    record_type: &'t RecordType,
    current_locale: String,
    clauses: Vec<Clause>,
    limit: Option<usize>,
}

impl<'t> Query<'t> {
    /// Starts an unfiltered query; `ctx` supplies the current locale for
    /// translation filters that do not name one.
    #[must_use]
    pub fn new(record_type: &'t RecordType, ctx: &LocaleContext) -> Self {
        Self {
            record_type,
            current_locale: ctx.current().to_string(),
            clauses: Vec::new(),
            limit: None,
        }
    }

    /// The record type this query selects.
    #[must_use]
    pub const fn record_type(&self) -> &'t RecordType {
        self.record_type
    }

    /// The clauses added so far.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    fn push(mut self, connector: Connector, predicate: Predicate) -> Self {
        self.clauses.push(Clause {
            connector,
            predicate,
        });
        self
    }

    fn scope(&self, locale: Option<&str>) -> LocaleScope {
        LocaleScope::Locale(locale.unwrap_or(&self.current_locale).to_string())
    }

    fn translation(
        &self,
        attribute: &str,
        op: Operator,
        value: Value,
        scope: LocaleScope,
    ) -> Predicate {
        Predicate::Translation {
            attribute: attribute.to_string(),
            op,
            value,
            scope,
        }
    }

    // ==================== Base Columns ====================

    /// ANDs `column = value`.
    #[must_use]
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_op(column, Operator::Eq, value)
    }

    /// ANDs `column op value`.
    #[must_use]
    pub fn where_op(self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        let predicate = Predicate::Column {
            column: column.to_string(),
            op,
            value: value.into(),
        };
        self.push(Connector::And, predicate)
    }

    /// ORs `column = value`.
    #[must_use]
    pub fn or_where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        let predicate = Predicate::Column {
            column: column.to_string(),
            op: Operator::Eq,
            value: value.into(),
        };
        self.push(Connector::Or, predicate)
    }

    // ==================== Translations ====================

    /// ANDs "has a row in `locale` (or the current locale) whose
    /// `attribute` equals `value`".
    #[must_use]
    pub fn where_translation(
        self,
        attribute: &str,
        value: impl Into<Value>,
        locale: Option<&str>,
    ) -> Self {
        self.where_translation_op(attribute, Operator::Eq, value, locale)
    }

    /// ANDs "has a row in `locale` (or the current locale) whose
    /// `attribute op value` holds".
    #[must_use]
    pub fn where_translation_op(
        self,
        attribute: &str,
        op: Operator,
        value: impl Into<Value>,
        locale: Option<&str>,
    ) -> Self {
        let predicate = self.translation(attribute, op, value.into(), self.scope(locale));
        self.push(Connector::And, predicate)
    }

    /// ORs the locale-scoped equality filter.
    #[must_use]
    pub fn or_where_translation(
        self,
        attribute: &str,
        value: impl Into<Value>,
        locale: Option<&str>,
    ) -> Self {
        self.or_where_translation_op(attribute, Operator::Eq, value, locale)
    }

    /// ORs the locale-scoped operator filter.
    #[must_use]
    pub fn or_where_translation_op(
        self,
        attribute: &str,
        op: Operator,
        value: impl Into<Value>,
        locale: Option<&str>,
    ) -> Self {
        let predicate = self.translation(attribute, op, value.into(), self.scope(locale));
        self.push(Connector::Or, predicate)
    }

    /// ANDs "has a row in any locale whose `attribute` equals `value`".
    #[must_use]
    pub fn where_translation_any_locale(self, attribute: &str, value: impl Into<Value>) -> Self {
        self.where_translation_any_locale_op(attribute, Operator::Eq, value)
    }

    /// ANDs "has a row in any locale whose `attribute op value` holds".
    #[must_use]
    pub fn where_translation_any_locale_op(
        self,
        attribute: &str,
        op: Operator,
        value: impl Into<Value>,
    ) -> Self {
        let predicate = self.translation(attribute, op, value.into(), LocaleScope::Any);
        self.push(Connector::And, predicate)
    }

    /// ORs the any-locale equality filter.
    #[must_use]
    pub fn or_where_translation_any_locale(
        self,
        attribute: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.or_where_translation_any_locale_op(attribute, Operator::Eq, value)
    }

    /// ORs the any-locale operator filter.
    #[must_use]
    pub fn or_where_translation_any_locale_op(
        self,
        attribute: &str,
        op: Operator,
        value: impl Into<Value>,
    ) -> Self {
        let predicate = self.translation(attribute, op, value.into(), LocaleScope::Any);
        self.push(Connector::Or, predicate)
    }

    /// ANDs "has a row in `locale`".
    #[must_use]
    pub fn translated_in(self, locale: &str) -> Self {
        let predicate = Predicate::HasLocale {
            locale: locale.to_string(),
            negated: false,
        };
        self.push(Connector::And, predicate)
    }

    /// ANDs "has no row in `locale`".
    #[must_use]
    pub fn not_translated_in(self, locale: &str) -> Self {
        let predicate = Predicate::HasLocale {
            locale: locale.to_string(),
            negated: true,
        };
        self.push(Connector::And, predicate)
    }

    /// Caps the number of returned records.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    // ==================== Compilation ====================

    /// Column names selected from the base table, in row order.
    pub(crate) fn selected_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once("id").chain(self.record_type.columns().iter().map(|c| c.name.as_str()))
    }

    /// Compiles the query into SQL and parameters.
    ///
    /// # Errors
    ///
    /// Returns a storage error when a column clause names an undeclared
    /// column, and an invalid-format error when a translation clause names
    /// an attribute that is not declared translatable.
    pub fn to_sql(&self) -> Result<CompiledQuery> {
        let ty = self.record_type;
        let mut sql = String::from("SELECT ");
        let columns: Vec<String> = self
            .selected_columns()
            .map(|c| format!("{BASE_ALIAS}.{}", quote_ident(c)))
            .collect();
        sql.push_str(&columns.join(", "));
        let _ = write!(sql, " FROM {} AS {BASE_ALIAS}", quote_ident(ty.table()));

        let mut params = Vec::new();
        for (i, clause) in self.clauses.iter().enumerate() {
            if i == 0 {
                sql.push_str(" WHERE ");
            } else {
                let _ = write!(sql, " {} ", clause.connector.sql());
            }
            self.push_predicate(&mut sql, &mut params, &clause.predicate)?;
        }

        let _ = write!(sql, " ORDER BY {BASE_ALIAS}.\"id\"");
        if let Some(limit) = self.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }

        Ok(CompiledQuery { sql, params })
    }

    fn push_predicate(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
        predicate: &Predicate,
    ) -> Result<()> {
        let ty = self.record_type;
        match predicate {
            Predicate::Column { column, op, value } => {
                if column != "id" && !ty.is_column(column) {
                    return Err(StorageError::UnknownColumn {
                        record_type: ty.name().to_string(),
                        column: column.clone(),
                    }
                    .into());
                }
                let lhs = format!("{BASE_ALIAS}.{}", quote_ident(column));
                push_comparison(sql, params, &lhs, *op, value);
            }
            Predicate::Translation {
                attribute,
                op,
                value,
                scope,
            } => {
                if !ty.is_translatable(attribute) {
                    return Err(Error::invalid_format(
                        attribute.as_str(),
                        format!("not a translatable attribute of {}", ty.name()),
                    ));
                }
                self.push_exists_head(sql, false);
                if let LocaleScope::Locale(locale) = scope {
                    let _ = write!(sql, " AND {VARIANT_ALIAS}.{} = ?", quote_ident(LOCALE_COLUMN));
                    params.push(Value::String(locale.clone()));
                }
                sql.push_str(" AND ");
                let lhs = format!("{VARIANT_ALIAS}.{}", quote_ident(attribute));
                push_comparison(sql, params, &lhs, *op, value);
                sql.push(')');
            }
            Predicate::HasLocale { locale, negated } => {
                self.push_exists_head(sql, *negated);
                let _ = write!(sql, " AND {VARIANT_ALIAS}.{} = ?)", quote_ident(LOCALE_COLUMN));
                params.push(Value::String(locale.clone()));
            }
        }
        Ok(())
    }

    fn push_exists_head(&self, sql: &mut String, negated: bool) {
        let ty = self.record_type;
        if negated {
            sql.push_str("NOT ");
        }
        let _ = write!(
            sql,
            "EXISTS (SELECT 1 FROM {} AS {VARIANT_ALIAS} WHERE {VARIANT_ALIAS}.{} = {BASE_ALIAS}.\"id\"",
            quote_ident(ty.variant_table()),
            quote_ident(ty.foreign_key()),
        );
    }
}

/// Writes `lhs op ?`, turning equality against null into `IS [NOT] NULL`.
fn push_comparison(sql: &mut String, params: &mut Vec<Value>, lhs: &str, op: Operator, value: &Value) {
    match (op, value) {
        (Operator::Eq, Value::Null) => {
            let _ = write!(sql, "{lhs} IS NULL");
        }
        (Operator::Ne, Value::Null) => {
            let _ = write!(sql, "{lhs} IS NOT NULL");
        }
        _ => {
            let _ = write!(sql, "{lhs} {} ?", op.sql());
            params.push(value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnDef, ColumnKind};
    use serde_json::json;

    fn product() -> RecordType {
        RecordType::builder("product")
            .table("products")
            .column(ColumnDef::new("sku", ColumnKind::Text))
            .translatable(["name"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_unfiltered_query() {
        let ty = product();
        let compiled = Query::new(&ty, &LocaleContext::default()).to_sql().unwrap();
        assert_eq!(
            compiled.sql,
            r#"SELECT b."id", b."sku" FROM "products" AS b ORDER BY b."id""#
        );
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_locale_defaults_to_context_current() {
        let ty = product();
        let ctx = LocaleContext::new("fr", "en");
        let query = Query::new(&ty, &ctx).where_translation("name", "Ordinateur", None);
        assert_eq!(
            query.clauses()[0].predicate,
            Predicate::Translation {
                attribute: "name".to_string(),
                op: Operator::Eq,
                value: json!("Ordinateur"),
                scope: LocaleScope::Locale("fr".to_string()),
            }
        );
        let compiled = query.to_sql().unwrap();
        assert_eq!(compiled.params, vec![json!("fr"), json!("Ordinateur")]);
        assert!(compiled.sql.contains(
            r#"EXISTS (SELECT 1 FROM "products_translations" AS t WHERE t."record_id" = b."id" AND t."locale" = ? AND t."name" = ?)"#
        ));
    }

    #[test]
    fn test_any_locale_has_no_locale_filter() {
        let ty = product();
        let compiled = Query::new(&ty, &LocaleContext::default())
            .where_translation_any_locale_op("name", Operator::Like, "Lap%")
            .to_sql()
            .unwrap();
        assert!(!compiled.sql.contains("\"locale\""));
        assert!(compiled.sql.contains(r#"t."name" LIKE ?"#));
        assert_eq!(compiled.params, vec![json!("Lap%")]);
    }

    #[test]
    fn test_or_connectors() {
        let ty = product();
        let compiled = Query::new(&ty, &LocaleContext::default())
            .where_eq("sku", "A")
            .or_where_translation("name", "Laptop", Some("en"))
            .or_where_translation_any_locale("name", "Portable")
            .to_sql()
            .unwrap();
        assert!(compiled.sql.contains(r#"WHERE b."sku" = ? OR EXISTS"#));
        assert_eq!(compiled.sql.matches(" OR EXISTS").count(), 2);
        assert_eq!(
            compiled.params,
            vec![json!("A"), json!("en"), json!("Laptop"), json!("Portable")]
        );
    }

    #[test]
    fn test_or_where_eq_joins_base_filters() {
        let ty = product();
        let compiled = Query::new(&ty, &LocaleContext::default())
            .where_eq("sku", "A")
            .or_where_eq("sku", "B")
            .to_sql()
            .unwrap();
        assert!(compiled.sql.contains(r#"WHERE b."sku" = ? OR b."sku" = ?"#));
        assert_eq!(compiled.params, vec![json!("A"), json!("B")]);
    }

    #[test]
    fn test_null_equality_becomes_is_null() {
        let ty = product();
        let compiled = Query::new(&ty, &LocaleContext::default())
            .where_eq("sku", Value::Null)
            .where_op("sku", Operator::Ne, Value::Null)
            .to_sql()
            .unwrap();
        assert!(compiled.sql.contains(r#"b."sku" IS NULL AND b."sku" IS NOT NULL"#));
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_translated_in_and_limit() {
        let ty = product();
        let compiled = Query::new(&ty, &LocaleContext::default())
            .translated_in("en")
            .not_translated_in("fr")
            .limit(5)
            .to_sql()
            .unwrap();
        assert!(compiled.sql.contains(" AND NOT EXISTS"));
        assert!(compiled.sql.ends_with("LIMIT 5"));
        assert_eq!(compiled.params, vec![json!("en"), json!("fr")]);
    }

    #[test]
    fn test_unknown_names_rejected() {
        let ty = product();
        let ctx = LocaleContext::default();
        let err = Query::new(&ty, &ctx).where_eq("name", "x").to_sql().unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::UnknownColumn { .. })));

        let err = Query::new(&ty, &ctx)
            .where_translation("sku", "x", None)
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }
}
