//! CLI command handler: read items, run the pipeline, print the artifact (or a JSON report).

use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::{BufRead, IsTerminal};

use crate::Opts;
use crate::engine::arg_parser::Cli;
use crate::engine::{CancelToken, DigestSet};
use crate::sign::sign_items;
use crate::utils::setup_logging;
use crate::utils::signer_toml::{apply_file_to_opts, load_signer_toml};

/// Overwrite opts field from CLI when the flag was given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $field:ident) => {
        if let Some(v) = $cli.$field {
            $opts.$field = v;
        }
    };
}

/// Defaults, then `.signer.toml` in the working directory, then CLI flags.
fn setup_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::default();
    if let Ok(cwd) = std::env::current_dir()
        && let Some(file) = load_signer_toml(&cwd)
    {
        apply_file_to_opts(&file, &mut opts);
    }
    apply_cli_opt!(cli, opts, quota);
    apply_cli_opt!(cli, opts, queue_capacity);
    apply_cli_opt!(cli, opts, fast_latency_ms);
    apply_cli_opt!(cli, opts, slow_latency_ms);
    apply_cli_opt!(cli, opts, exclusive);
    apply_cli_opt!(cli, opts, json);
    apply_cli_opt!(cli, opts, verbose);
    setup_logging(opts.verbose);
    opts
}

/// Items from the command line, or one per line from stdin when none were given.
fn read_items(cli: &Cli) -> Result<Vec<String>> {
    if !cli.items.is_empty() {
        return Ok(cli.items.clone());
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        warn!("No items given and stdin is a terminal; signing an empty input.");
        return Ok(Vec::new());
    }
    stdin
        .lock()
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .context("read items from stdin")
}

/// Run the pipeline once. Ctrl+C cancels the run; nothing is printed for a cancelled run.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    let items = read_items(cli)?;
    debug!("Signing {} items with quota {}", items.len(), opts.effective_quota());

    let cancel = CancelToken::new();
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        cancel_handler.cancel();
    })
    .context("set Ctrl+C handler")?;

    let report = sign_items(items, &opts, DigestSet::from_opts(&opts), cancel)?;
    if opts.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize run report")?
        );
    } else {
        println!("{}", report.artifact);
    }
    Ok(())
}
