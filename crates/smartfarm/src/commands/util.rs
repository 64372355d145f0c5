//! Shared helpers for command handlers.

use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;

use smartfarm_core::types::{ListParams, SortOrder};

use crate::cli::{ListArgs, SortDirection};
use crate::error::CliError;

/// Translate list flags into query parameters.
pub fn list_params(args: &ListArgs) -> Result<ListParams, CliError> {
    let mut params = ListParams::page(args.page, args.limit);
    params.search.clone_from(&args.search);
    params.status.clone_from(&args.status);
    params.sort_by.clone_from(&args.sort_by);
    params.order = args.order.map(|o| match o {
        SortDirection::Asc => SortOrder::Asc,
        SortDirection::Desc => SortOrder::Desc,
    });
    for raw in &args.filters {
        let (key, value) = parse_key_value("filter", raw)?;
        params = params.with_filter(key, value);
    }
    Ok(params)
}

/// Split `KEY=VALUE`.
pub fn parse_key_value(field: &str, raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_owned(), value.to_owned())),
        _ => Err(CliError::Validation {
            field: field.into(),
            reason: format!("expected KEY=VALUE, got '{raw}'"),
        }),
    }
}

/// Parse a lower/snake-case enum value, listing the choices on failure.
pub fn parse_choice<T: FromStr>(field: &str, raw: &str, choices: &str) -> Result<T, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("'{raw}' is not one of: {choices}"),
    })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("{}: {e}", path.display()),
    })
}

/// Turn a disabled (empty-id) query into a usage error.
pub fn require<T>(value: Option<T>, what: &str) -> Result<T, CliError> {
    value.ok_or_else(|| CliError::Validation {
        field: what.into(),
        reason: "must not be empty".into(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smartfarm_core::types::FarmerStatus;

    use super::*;

    fn list_args(filters: &[&str]) -> ListArgs {
        ListArgs {
            page: 2,
            limit: 25,
            search: Some("maize".into()),
            status: None,
            sort_by: None,
            order: Some(SortDirection::Desc),
            filters: filters.iter().map(|f| (*f).to_owned()).collect(),
        }
    }

    #[test]
    fn list_flags_become_query_params() {
        let params = list_params(&list_args(&["farmerId=f-1"])).unwrap();
        assert_eq!(params.page, Some(2));
        assert_eq!(params.limit, Some(25));
        assert_eq!(params.search.as_deref(), Some("maize"));
        assert_eq!(params.order, Some(SortOrder::Desc));
        assert_eq!(params.filters.get("farmerId").map(String::as_str), Some("f-1"));
    }

    #[test]
    fn malformed_filter_is_rejected() {
        assert!(matches!(
            list_params(&list_args(&["farmerId"])),
            Err(CliError::Validation { .. })
        ));
        assert!(parse_key_value("param", "=x").is_err());
    }

    #[test]
    fn filter_values_may_contain_equals() {
        let (k, v) = parse_key_value("param", "expr=a=b").unwrap();
        assert_eq!((k.as_str(), v.as_str()), ("expr", "a=b"));
    }

    #[test]
    fn choices_parse_case_sensitively() {
        let status: FarmerStatus = parse_choice("status", "active", "active, inactive, pending").unwrap();
        assert_eq!(status, FarmerStatus::Active);
        assert!(parse_choice::<FarmerStatus>("status", "retired", "active, inactive, pending").is_err());
    }

    #[test]
    fn confirm_with_yes_skips_prompt() {
        assert!(confirm("Delete farmer f-1?", true).unwrap());
    }
}
