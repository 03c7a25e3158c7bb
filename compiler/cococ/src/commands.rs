//! Command handlers for the `coco` CLI.
//!
//! Each command has a pure text-to-text core (`*_text`) and a file-level
//! wrapper that reads the input, writes the result, and reports failures.

use std::path::{Path, PathBuf};

use coco_bounds::{
    instrument_module, rewrite_module, run_bounds_pipeline, BoundsConfig, BoundsError,
    InstrumentOutcome, PipelineReport, SizeParamTable,
};
use coco_ir::{parse_module, verify_module, Module, ParseError, VerifyError};

/// Anything that stops a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("cannot read `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write `{path}`: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Bounds(#[from] BoundsError),

    #[error("{}", join_verify_errors(.0))]
    Verify(Vec<VerifyError>),

    #[error("{0}")]
    Usage(String),
}

fn join_verify_errors(errors: &[VerifyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Options shared by every command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Write output here instead of stdout.
    pub output: Option<PathBuf>,
    /// `instrument` only: the input was already rewritten, insert checks
    /// without cloning again.
    pub no_rewrite: bool,
    pub config: BoundsConfig,
}

/// Parse the arguments following the command name: one input path plus
/// `-o <path>`, `--no-rewrite`, `--entry=<name>` and `--check-fn=<name>`.
pub fn parse_options(args: &[String]) -> Result<(PathBuf, Options), CommandError> {
    let mut options = Options::default();
    let mut input = None;
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "-o" {
            let Some(path) = args.get(i + 1) else {
                return Err(CommandError::Usage("`-o` needs a path".to_owned()));
            };
            options.output = Some(PathBuf::from(path));
            i += 2;
            continue;
        }
        if arg == "--no-rewrite" {
            options.no_rewrite = true;
        } else if let Some(name) = arg.strip_prefix("--entry=") {
            options.config.entry_name = name.to_owned();
        } else if let Some(name) = arg.strip_prefix("--check-fn=") {
            options.config.check_fn = name.to_owned();
        } else if arg.starts_with('-') {
            return Err(CommandError::Usage(format!("unknown option `{arg}`")));
        } else if input.is_none() {
            input = Some(PathBuf::from(arg));
        } else {
            return Err(CommandError::Usage(format!("unexpected argument `{arg}`")));
        }
        i += 1;
    }
    let input = input.ok_or_else(|| CommandError::Usage("missing input file".to_owned()))?;
    Ok((input, options))
}

// ── Text-level commands ─────────────────────────────────────────────

fn verified(module: Module) -> Result<Module, CommandError> {
    verify_module(&module).map_err(CommandError::Verify)?;
    Ok(module)
}

/// Rewrite signatures and insert bounds checks.
pub fn instrument_text(src: &str, config: &BoundsConfig) -> Result<(String, PipelineReport), CommandError> {
    let mut module = verified(parse_module(src)?)?;
    let report = run_bounds_pipeline(&mut module, config)?;
    let module = verified(module)?;
    Ok((module.to_string(), report))
}

/// Insert bounds checks into a module whose signatures were already
/// rewritten, pairing size parameters by name.
pub fn check_text(src: &str, config: &BoundsConfig) -> Result<(String, InstrumentOutcome), CommandError> {
    let mut module = verified(parse_module(src)?)?;
    let sizes = SizeParamTable::recover(&module, config);
    let outcome = instrument_module(&mut module, &sizes, config)?;
    let module = verified(module)?;
    Ok((module.to_string(), outcome))
}

/// Signature rewriting only.
pub fn rewrite_text(src: &str, config: &BoundsConfig) -> Result<String, CommandError> {
    let mut module = verified(parse_module(src)?)?;
    rewrite_module(&mut module, config)?;
    Ok(verified(module)?.to_string())
}

/// Parse and structurally verify. Returns the number of live functions.
pub fn verify_text(src: &str) -> Result<usize, CommandError> {
    let module = verified(parse_module(src)?)?;
    Ok(module.functions().count())
}

/// Parse and pretty-print.
pub fn print_text(src: &str) -> Result<String, CommandError> {
    Ok(parse_module(src)?.to_string())
}

// ── File-level commands ─────────────────────────────────────────────

fn read_file(path: &Path) -> Result<String, CommandError> {
    std::fs::read_to_string(path).map_err(|source| CommandError::Read {
        path: path.to_owned(),
        source,
    })
}

fn emit(text: &str, output: Option<&Path>) -> Result<(), CommandError> {
    match output {
        Some(path) => std::fs::write(path, text).map_err(|source| CommandError::Write {
            path: path.to_owned(),
            source,
        }),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

pub fn instrument_file(input: &Path, options: &Options) -> Result<(), CommandError> {
    if options.no_rewrite {
        let (text, outcome) = check_text(&read_file(input)?, &options.config)?;
        tracing::info!(checks = outcome.checks, "checked {}", input.display());
        return emit(&text, options.output.as_deref());
    }
    let (text, report) = instrument_text(&read_file(input)?, &options.config)?;
    tracing::info!(
        clones = report.clones.len(),
        redirected = report.redirected,
        checks = report.checks,
        "instrumented {}",
        input.display()
    );
    emit(&text, options.output.as_deref())
}

pub fn rewrite_file(input: &Path, options: &Options) -> Result<(), CommandError> {
    let text = rewrite_text(&read_file(input)?, &options.config)?;
    emit(&text, options.output.as_deref())
}

pub fn verify_file(input: &Path) -> Result<(), CommandError> {
    let functions = verify_text(&read_file(input)?)?;
    println!("OK: {} ({functions} functions)", input.display());
    Ok(())
}

pub fn print_file(input: &Path, options: &Options) -> Result<(), CommandError> {
    let text = print_text(&read_file(input)?)?;
    emit(&text, options.output.as_deref())
}

#[cfg(test)]
mod tests;
