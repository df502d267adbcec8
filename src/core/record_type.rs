//! Record type declarations.
//!
//! A [`RecordType`] describes one base table, its companion variant table,
//! the foreign key linking them, and which attributes are translatable.
//! Declarations are validated once, at build time, and carry a lookup table
//! from attribute name to [`AttributeKind`] so reads never re-inspect the
//! declaration.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Default foreign-key column on variant tables.
pub const DEFAULT_FOREIGN_KEY: &str = "record_id";

/// Suffix appended to the base table name to form the variant table name.
pub const VARIANT_TABLE_SUFFIX: &str = "_translations";

/// Column name holding the locale code on variant tables.
pub const LOCALE_COLUMN: &str = "locale";

/// Columns reserved by the storage layout.
const RESERVED: &[&str] = &["id"];

fn identifier_regex() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

/// Checks that a table or column name is a plain SQL identifier.
///
/// # Errors
///
/// Returns a configuration error naming the rejected identifier.
pub fn validate_identifier(what: &str, name: &str) -> Result<()> {
    if identifier_regex().is_match(name) {
        Ok(())
    } else {
        Err(Error::config(format!("invalid {what} name: {name:?}")))
    }
}

/// Storage affinity of a base column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Text column.
    Text,
    /// Integer column.
    Integer,
    /// Floating point column.
    Real,
    /// Boolean column (stored as 0/1).
    Boolean,
    /// Untyped column; values are stored as given.
    #[default]
    Any,
}

impl ColumnKind {
    /// Returns the SQL type name used in generated DDL.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
            Self::Any => "",
        }
    }
}

/// A locale-invariant base column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Storage affinity.
    #[serde(default)]
    pub kind: ColumnKind,
    /// Whether a UNIQUE constraint applies.
    #[serde(default)]
    pub unique: bool,
    /// Whether a NOT NULL constraint applies.
    #[serde(default)]
    pub not_null: bool,
}

impl ColumnDef {
    /// Creates an unconstrained column.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            unique: false,
            not_null: false,
        }
    }

    /// Marks the column UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
}

/// How an attribute name is read on a record of a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Stored on the base row.
    Column,
    /// Stored per locale on variant rows.
    Translated,
}

/// A validated record type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    name: String,
    table: String,
    variant_table: String,
    foreign_key: String,
    columns: Vec<ColumnDef>,
    translatable: Vec<String>,
    attributes: HashMap<String, AttributeKind>,
}

impl RecordType {
    /// Starts a declaration for the named type.
    ///
    /// # Examples
    ///
    /// ```
    /// use locale_overlay::core::{ColumnDef, ColumnKind, RecordType};
    ///
    /// let product = RecordType::builder("product")
    ///     .table("products")
    ///     .column(ColumnDef::new("sku", ColumnKind::Text).unique())
    ///     .translatable(["name", "description"])
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(product.variant_table(), "products_translations");
    /// assert!(product.is_translatable("name"));
    /// ```
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder::new(name)
    }

    /// Registered type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Variant table name.
    #[must_use]
    pub fn variant_table(&self) -> &str {
        &self.variant_table
    }

    /// Foreign-key column on the variant table.
    #[must_use]
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    /// Declared base columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Declared translatable attribute names, in declaration order.
    #[must_use]
    pub fn translatable(&self) -> &[String] {
        &self.translatable
    }

    /// Looks up how an attribute is stored.
    #[must_use]
    pub fn attribute_kind(&self, name: &str) -> Option<AttributeKind> {
        self.attributes.get(name).copied()
    }

    /// Whether the attribute is declared translatable.
    #[must_use]
    pub fn is_translatable(&self, name: &str) -> bool {
        self.attribute_kind(name) == Some(AttributeKind::Translated)
    }

    /// Whether the attribute is a declared base column.
    #[must_use]
    pub fn is_column(&self, name: &str) -> bool {
        self.attribute_kind(name) == Some(AttributeKind::Column)
    }
}

/// Builder for [`RecordType`].
#[derive(Debug, Clone)]
pub struct RecordTypeBuilder {
    name: String,
    table: Option<String>,
    variant_table: Option<String>,
    foreign_key: Option<String>,
    columns: Vec<ColumnDef>,
    translatable: Option<Vec<String>>,
}

impl RecordTypeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            variant_table: None,
            foreign_key: None,
            columns: Vec::new(),
            translatable: None,
        }
    }

    /// Sets the base table name (defaults to the type name).
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Overrides the variant table name.
    #[must_use]
    pub fn variant_table(mut self, table: impl Into<String>) -> Self {
        self.variant_table = Some(table.into());
        self
    }

    /// Overrides the foreign-key column name.
    #[must_use]
    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = Some(column.into());
        self
    }

    /// Adds a base column.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds several base columns.
    #[must_use]
    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnDef>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Declares the translatable attribute names.
    #[must_use]
    pub fn translatable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.translatable = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Validates the declaration and builds the attribute lookup table.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the translatable set was never
    /// declared or is empty, when a name is not a plain identifier, when a
    /// name is declared twice, or when a translatable attribute collides with
    /// a base column.
    pub fn build(self) -> Result<RecordType> {
        let Some(translatable) = self.translatable else {
            return Err(Error::config(format!(
                "record type {} has no translatable attributes declared",
                self.name
            )));
        };
        if translatable.is_empty() {
            return Err(Error::config(format!(
                "record type {} declares an empty translatable set",
                self.name
            )));
        }

        let table = self.table.unwrap_or_else(|| self.name.clone());
        let variant_table = self
            .variant_table
            .unwrap_or_else(|| format!("{table}{VARIANT_TABLE_SUFFIX}"));
        let foreign_key = self
            .foreign_key
            .unwrap_or_else(|| DEFAULT_FOREIGN_KEY.to_string());

        validate_identifier("table", &table)?;
        validate_identifier("table", &variant_table)?;
        validate_identifier("column", &foreign_key)?;
        if table == variant_table {
            return Err(Error::config(format!(
                "record type {}: variant table must differ from base table",
                self.name
            )));
        }

        let mut attributes = HashMap::new();
        for column in &self.columns {
            validate_identifier("column", &column.name)?;
            if RESERVED.contains(&column.name.as_str()) {
                return Err(Error::config(format!(
                    "record type {}: column {} is reserved",
                    self.name, column.name
                )));
            }
            if attributes
                .insert(column.name.clone(), AttributeKind::Column)
                .is_some()
            {
                return Err(Error::config(format!(
                    "record type {}: column {} declared twice",
                    self.name, column.name
                )));
            }
        }

        let variant_reserved = [foreign_key.as_str(), LOCALE_COLUMN];
        for attribute in &translatable {
            validate_identifier("attribute", attribute)?;
            if RESERVED.contains(&attribute.as_str()) || variant_reserved.contains(&attribute.as_str())
            {
                return Err(Error::config(format!(
                    "record type {}: translatable attribute {attribute} is reserved",
                    self.name
                )));
            }
            match attributes.insert(attribute.clone(), AttributeKind::Translated) {
                Some(AttributeKind::Column) => {
                    return Err(Error::config(format!(
                        "record type {}: {attribute} is both a column and translatable",
                        self.name
                    )));
                }
                Some(AttributeKind::Translated) => {
                    return Err(Error::config(format!(
                        "record type {}: translatable attribute {attribute} declared twice",
                        self.name
                    )));
                }
                None => {}
            }
        }

        Ok(RecordType {
            name: self.name,
            table,
            variant_table,
            foreign_key,
            columns: self.columns,
            translatable,
            attributes,
        })
    }
}
