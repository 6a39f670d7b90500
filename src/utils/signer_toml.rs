//! Load `.signer.toml` from a directory (CLI only). Lib does not use this; the consuming program injects config via SignerOpts.

use serde::Deserialize;
use std::path::Path;

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SignerToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    quota: Option<usize>,
    queue_capacity: Option<usize>,
    fast_latency_ms: Option<u64>,
    slow_latency_ms: Option<u64>,
    exclusive: Option<bool>,
    verbose: Option<bool>,
    json: Option<bool>,
}

/// Load the package config file from `dir` if present. Returns None if file missing or unreadable. CLI only.
pub(crate) fn load_signer_toml(dir: &Path) -> Option<SignerToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_signer_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_signer_toml(s: &str) -> Result<SignerToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $file_field:ident => $opts_field:ident) => {
        if let Some(v) = $section.$file_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only set fields present in the file). Call before applying CLI.
pub(crate) fn apply_file_to_opts(file: &SignerToml, opts: &mut Opts) {
    let s = &file.settings;
    apply_file_opt!(s, opts, quota => quota);
    apply_file_opt!(s, opts, queue_capacity => queue_capacity);
    apply_file_opt!(s, opts, fast_latency_ms => fast_latency_ms);
    apply_file_opt!(s, opts, slow_latency_ms => slow_latency_ms);
    apply_file_opt!(s, opts, exclusive => exclusive);
    apply_file_opt!(s, opts, verbose => verbose);
    apply_file_opt!(s, opts, json => json);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_only_present_fields() {
        let file = parse_signer_toml("[settings]\nquota = 3\nslow_latency_ms = 10\n").unwrap();
        let mut opts = Opts {
            queue_capacity: 7,
            ..Opts::default()
        };
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.quota, 3);
        assert_eq!(opts.slow_latency_ms, 10);
        assert_eq!(opts.queue_capacity, 7);
        assert!(!opts.json);
    }

    #[test]
    fn test_missing_settings_table_is_empty() {
        let file = parse_signer_toml("").unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.quota, Opts::default().quota);
    }

    #[test]
    fn test_unknown_type_is_error() {
        assert!(parse_signer_toml("[settings]\nquota = \"many\"\n").is_err());
    }
}
