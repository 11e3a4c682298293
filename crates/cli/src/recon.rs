//! `auditrec run` / `auditrec validate`: config-driven GL-to-bank reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

use auditrec_io::ExceptionReport;
use auditrec_recon::config::InputFormat;
use auditrec_recon::{MatchConfig, Normalized, ReconConfig, ReconError, ReconResult, RowRejection, Side, SourceConfig};

use crate::exit_codes::{
    EXIT_RECON_EXCEPTIONS, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_REJECTED, EXIT_RECON_RUNTIME,
};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile the GL and Bank exports named in a TOML run config
    #[command(after_help = "\
Examples:
  auditrec run recon.toml
  auditrec run recon.toml --json
  auditrec run recon.toml --xlsx Audit_Exception_Report.xlsx --csv-dir report
  auditrec run recon.toml --strict --output result.json")]
    Run {
        /// Path to the recon.toml run config
        config: PathBuf,

        /// Print the JSON result to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON result to file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the Excel exception report (overrides [output] xlsx)
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Write the report sections as CSV files into DIR (overrides [output] csv_dir)
        #[arg(long, value_name = "DIR")]
        csv_dir: Option<PathBuf>,

        /// Exit 4 when any input row was rejected
        #[arg(long)]
        strict: bool,
    },

    /// Validate a run config without reading the ledgers
    #[command(after_help = "\
Examples:
  auditrec validate recon.toml")]
    Validate {
        /// Path to the recon.toml run config
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, xlsx, csv_dir, strict } => {
            cmd_recon_run(config, RunOutputs { json_stdout: json, json: output, xlsx, csv_dir }, strict)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError::new(code, msg)
}

/// Output destinations given on the command line.
struct RunOutputs {
    json_stdout: bool,
    json: Option<PathBuf>,
    xlsx: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
}

/// JSON document written by `run`: the engine result plus the rows that
/// never became records.
#[derive(Serialize)]
struct RunReport<'a> {
    #[serde(flatten)]
    result: &'a ReconResult,
    rejected: RejectedRows<'a>,
}

#[derive(Serialize)]
struct RejectedRows<'a> {
    gl: &'a [RowRejection],
    bank: &'a [RowRejection],
}

fn read_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot read config: {e}")))?;

    ReconConfig::from_toml(&config_str).map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, e.to_string()))
}

fn load_side(side: Side, base_dir: &Path, source: &SourceConfig) -> Result<Normalized, CliError> {
    let path = base_dir.join(&source.file);
    let text = auditrec_io::source::read_text(&path)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {e}", path.display())))?;

    let loaded = match source.format() {
        InputFormat::Csv => auditrec_recon::load_csv(side, &text, source),
        InputFormat::Json => auditrec_recon::load_json(side, &text, source),
    };

    loaded.map_err(|e| {
        let err = recon_err(EXIT_RECON_RUNTIME, format!("{}: {e}", path.display()));
        match e {
            ReconError::MissingColumn { .. } => {
                let table = if side == Side::Gl { "gl" } else { "bank" };
                err.with_hint(format!("map the header under [{table}.columns]"))
            }
            _ => err,
        }
    })
}

/// CLI flag wins; otherwise the config value, resolved against the config directory.
fn resolve_output(flag: Option<PathBuf>, configured: Option<&String>, base_dir: &Path) -> Option<PathBuf> {
    flag.or_else(|| configured.map(|p| base_dir.join(p)))
}

fn cmd_recon_run(config_path: PathBuf, outputs: RunOutputs, strict: bool) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let gl = load_side(Side::Gl, base_dir, &config.gl)?;
    let bank = load_side(Side::Bank, base_dir, &config.bank)?;

    let rejected = gl.rejected.len() + bank.rejected.len();
    if rejected > 0 {
        log::warn!(
            "{} row(s) rejected during normalization ({} GL, {} Bank)",
            rejected,
            gl.rejected.len(),
            bank.rejected.len()
        );
    }

    // Run engine
    let result = auditrec_recon::reconcile(&config.name, MatchConfig::default(), gl.records, bank.records)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, e.to_string()))?;

    // JSON
    let json_path = resolve_output(outputs.json, config.output.json.as_ref(), base_dir);
    if outputs.json_stdout || json_path.is_some() {
        let report = RunReport {
            result: &result,
            rejected: RejectedRows { gl: &gl.rejected, bank: &bank.rejected },
        };
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = json_path {
            std::fs::write(path, &json_str)
                .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }

        if outputs.json_stdout {
            println!("{json_str}");
        }
    }

    // Exception report
    let xlsx_path = resolve_output(outputs.xlsx, config.output.xlsx.as_ref(), base_dir);
    let csv_dir = resolve_output(outputs.csv_dir, config.output.csv_dir.as_ref(), base_dir);
    if xlsx_path.is_some() || csv_dir.is_some() {
        let report = ExceptionReport::from_result(&result);

        if let Some(ref path) = xlsx_path {
            auditrec_io::xlsx::write_report(&report, path)
                .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }

        if let Some(ref dir) = csv_dir {
            let written = auditrec_io::csv::write_sections(&report, dir)
                .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write {}: {e}", dir.display())))?;
            for path in written {
                eprintln!("wrote {}", path.display());
            }
        }
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "recon '{}': {} groups ({} exact, {} fuzzy, {} aggregate); {} GL / {} Bank exceptions",
        result.meta.name,
        s.total_groups,
        s.exact_groups,
        s.fuzzy_groups,
        s.aggregate_groups,
        s.gl_exceptions(),
        s.bank_exceptions(),
    );
    eprintln!(
        "GL {:.2}  Bank {:.2}  variance {:.2}{}",
        s.balance.gl_total,
        s.balance.bank_total,
        s.balance.variance,
        if s.balance.flagged { " (flagged)" } else { "" },
    );
    if s.gl_undated + s.bank_undated > 0 {
        eprintln!("undated: {} GL, {} Bank", s.gl_undated, s.bank_undated);
    }

    if strict && rejected > 0 {
        return Err(recon_err(EXIT_RECON_REJECTED, format!("{rejected} input row(s) rejected (--strict)"))
            .with_hint("the rejected rows are listed under \"rejected\" in the JSON output"));
    }

    if !s.is_reconciled() {
        return Err(recon_err(EXIT_RECON_EXCEPTIONS, "exceptions remain"));
    }

    Ok(())
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: recon '{}' (gl: {}, bank: {})",
        config.name, config.gl.file, config.bank.file,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_configured_output() {
        let base = Path::new("/books/jan");
        let configured = "result.json".to_string();

        assert_eq!(
            resolve_output(Some(PathBuf::from("out.json")), Some(&configured), base),
            Some(PathBuf::from("out.json"))
        );
        assert_eq!(
            resolve_output(None, Some(&configured), base),
            Some(PathBuf::from("/books/jan/result.json"))
        );
        assert_eq!(resolve_output(None, None, base), None);
    }
}
