//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::cli::output::{
    OutputFormat, format_record, format_record_list, format_status, format_written,
};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::Fields;
use crate::error::{CommandError, Result, StorageError};
use crate::query::Operator;
use crate::storage::{SqliteStorage, Storage};
use crate::translator::Translator;
use serde_json::Value;
use std::path::Path;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();
    let translator = Translator::from_config(load_config(&cli.config)?)?;

    match &cli.command {
        Commands::Init { force } => cmd_init(&db_path, &translator, *force),
        Commands::Status => cmd_status(&db_path, &translator, format),
        Commands::Create {
            record_type,
            payload,
        } => cmd_create(&db_path, &translator, record_type, payload, format),
        Commands::Update {
            record_type,
            id,
            payload,
        } => cmd_update(&db_path, &translator, record_type, *id, payload, format),
        Commands::Upsert {
            record_type,
            criteria,
            payload,
        } => cmd_upsert(&db_path, &translator, record_type, criteria, payload, format),
        Commands::Get {
            record_type,
            id,
            locale,
            all,
        } => cmd_get(
            &db_path,
            &translator,
            record_type,
            *id,
            locale.as_deref(),
            *all,
            format,
        ),
        Commands::Find {
            record_type,
            attribute,
            value,
            op,
            locale,
            any_locale,
            limit,
        } => cmd_find(
            &db_path,
            &translator,
            &FindArgs {
                record_type,
                attribute,
                value,
                op,
                locale: locale.as_deref(),
                any_locale: *any_locale,
                limit: *limit,
            },
            format,
        ),
        Commands::Delete { record_type, id } => {
            cmd_delete(&db_path, &translator, record_type, *id, format)
        }
    }
}

/// Reads the config file when present, then applies environment overrides.
fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::from_file(path)?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Config::default()
    };
    config.apply_env()
}

/// Opens storage and ensures it's initialized.
fn open_storage(db_path: &Path) -> Result<SqliteStorage> {
    let storage = SqliteStorage::open(db_path)?;

    if !storage.is_initialized()? {
        return Err(StorageError::NotInitialized.into());
    }

    Ok(storage)
}

/// Parses a JSON object argument.
fn parse_object(what: &str, text: &str) -> Result<Fields> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(CommandError::InvalidArgument(format!("{what} must be a JSON object")).into()),
        Err(e) => Err(CommandError::InvalidArgument(format!("{what} is not valid JSON: {e}")).into()),
    }
}

/// Parses a scalar argument as JSON, falling back to a plain string.
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

// ==================== Command Implementations ====================

fn cmd_init(db_path: &Path, translator: &Translator, force: bool) -> Result<String> {
    // Check if already exists
    if db_path.exists() && !force {
        return Err(CommandError::ExecutionFailed(
            "Database already exists. Use --force to reinitialize.".to_string(),
        )
        .into());
    }

    if force && db_path.exists() {
        std::fs::remove_file(db_path).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to remove existing database: {e}"))
        })?;
    }

    let mut storage = SqliteStorage::open(db_path)?;
    translator.init(&mut storage)?;

    Ok(format!(
        "Initialized database at: {} ({} record type(s))\n",
        db_path.display(),
        translator.registry().len()
    ))
}

fn cmd_status(db_path: &Path, translator: &Translator, format: OutputFormat) -> Result<String> {
    let storage = open_storage(db_path)?;
    let stats = storage.stats(translator.registry())?;
    Ok(format_status(&stats, format))
}

fn cmd_create(
    db_path: &Path,
    translator: &Translator,
    record_type: &str,
    payload: &str,
    format: OutputFormat,
) -> Result<String> {
    let storage = open_storage(db_path)?;
    let payload = parse_object("payload", payload)?;
    let record = translator.create(&storage, record_type, &payload)?;
    Ok(format_written("Created", &record, format))
}

fn cmd_update(
    db_path: &Path,
    translator: &Translator,
    record_type: &str,
    id: i64,
    payload: &str,
    format: OutputFormat,
) -> Result<String> {
    let storage = open_storage(db_path)?;
    let payload = parse_object("payload", payload)?;
    let mut record = translator
        .find(&storage, record_type, id)?
        .ok_or_else(|| StorageError::RecordNotFound {
            record_type: record_type.to_string(),
            id,
        })?;
    translator.update(&storage, &mut record, &payload)?;
    Ok(format_written("Updated", &record, format))
}

fn cmd_upsert(
    db_path: &Path,
    translator: &Translator,
    record_type: &str,
    criteria: &str,
    payload: &str,
    format: OutputFormat,
) -> Result<String> {
    let storage = open_storage(db_path)?;
    let criteria = parse_object("criteria", criteria)?;
    let payload = parse_object("payload", payload)?;
    let record = translator.update_or_create(&storage, record_type, &criteria, &payload)?;
    Ok(format_written("Saved", &record, format))
}

fn cmd_get(
    db_path: &Path,
    translator: &Translator,
    record_type: &str,
    id: i64,
    locale: Option<&str>,
    all: bool,
    format: OutputFormat,
) -> Result<String> {
    let storage = open_storage(db_path)?;
    let ty = translator.registry().get(record_type)?;
    let mut record = translator
        .find(&storage, record_type, id)?
        .ok_or_else(|| StorageError::RecordNotFound {
            record_type: record_type.to_string(),
            id,
        })?;

    let locale = locale.unwrap_or(translator.config().default_locale.as_str());
    let mut attributes = Fields::new();
    for name in ty.translatable() {
        let value = if all {
            let per_locale = translator.all_locales(&storage, &mut record, name)?;
            Value::Object(per_locale.into_iter().collect())
        } else {
            translator
                .resolve(&storage, &mut record, name, locale)?
                .unwrap_or(Value::Null)
        };
        attributes.insert(name.clone(), value);
    }

    Ok(format_record(&record, &attributes, format))
}

struct FindArgs<'a> {
    record_type: &'a str,
    attribute: &'a str,
    value: &'a str,
    op: &'a str,
    locale: Option<&'a str>,
    any_locale: bool,
    limit: Option<usize>,
}

fn cmd_find(
    db_path: &Path,
    translator: &Translator,
    args: &FindArgs<'_>,
    format: OutputFormat,
) -> Result<String> {
    let storage = open_storage(db_path)?;
    let op: Operator = args.op.parse()?;
    let value = parse_value(args.value);
    let ctx = args
        .locale
        .map_or_else(|| translator.context(), |l| translator.context_for(l));

    let mut query = translator.query(args.record_type, &ctx)?;
    query = if args.any_locale {
        query.where_translation_any_locale_op(args.attribute, op, value)
    } else {
        query.where_translation_op(args.attribute, op, value, None)
    };
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }

    let records = translator.select(&storage, &query)?;
    Ok(format_record_list(&records, format))
}

fn cmd_delete(
    db_path: &Path,
    translator: &Translator,
    record_type: &str,
    id: i64,
    format: OutputFormat,
) -> Result<String> {
    let storage = open_storage(db_path)?;
    let mut record = translator
        .find(&storage, record_type, id)?
        .ok_or_else(|| StorageError::RecordNotFound {
            record_type: record_type.to_string(),
            id,
        })?;
    translator.delete(&storage, &mut record)?;
    Ok(match format {
        OutputFormat::Text => format!("Deleted {record_type} #{id}\n"),
        OutputFormat::Json => {
            format!("{}\n", serde_json::json!({"deleted": {"record_type": record_type, "id": id}}))
        }
    })
}
