//! Output rendering (SPEC_FULL §10.4): every list/show command renders
//! through one of these formats rather than hand-rolling `println!` calls
//! at each call site.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Pretty,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

/// Render a list of primary keys (`armory <subject> list`, §4.2 "List").
pub fn print_list(format: OutputFormat, kind: &str, keys: &[String]) {
    match format {
        OutputFormat::Text => {
            println!("{} {kind}(s)", keys.len());
            for key in keys {
                println!("{key}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::json!({ "count": keys.len(), "keys": keys })),
        OutputFormat::Pretty => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "count": keys.len(), "keys": keys })).unwrap_or_default())
        }
    }
}

/// Render labeled field/value pairs (`armory <subject> show`, §4.2 "Show").
pub fn print_fields(format: OutputFormat, fields: &[(&str, String)]) {
    match format {
        OutputFormat::Text => {
            for (label, value) in fields {
                println!("{label}: {value}");
            }
        }
        OutputFormat::Json | OutputFormat::Pretty => {
            let map: serde_json::Map<String, serde_json::Value> =
                fields.iter().map(|(k, v)| ((*k).to_owned(), serde_json::Value::String(v.clone()))).collect();
            let value = serde_json::Value::Object(map);
            if format == OutputFormat::Pretty {
                println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            } else {
                println!("{value}");
            }
        }
    }
}

/// Render an arbitrary serializable payload, for ad hoc outputs like
/// `system --vars`.
pub fn print_value<T: Serialize>(format: OutputFormat, value: &T) {
    match format {
        OutputFormat::Text => {
            if let Ok(text) = serde_json::to_string(value) {
                println!("{text}");
            }
        }
        OutputFormat::Json => {
            if let Ok(text) = serde_json::to_string(value) {
                println!("{text}");
            }
        }
        OutputFormat::Pretty => {
            if let Ok(text) = serde_json::to_string_pretty(value) {
                println!("{text}");
            }
        }
    }
}
