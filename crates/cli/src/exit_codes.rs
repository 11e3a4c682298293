//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: month-end scripts branch on
//! them.
//!
//! # Exit Code Ranges
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Reconciled: no exceptions, variance within epsilon        |
//! | 2    | CLI usage error (bad args)                                |
//! | 3    | Exceptions remain or variance flagged                     |
//! | 4    | Input rows were rejected and `--strict` was given         |
//! | 5    | Invalid run config                                        |
//! | 6    | Runtime error (unreadable input, write failure, engine)   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0, 2)
// =============================================================================

/// Success - books reconciled, or a non-run command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-9)
// =============================================================================

/// Unmatched records remain on either side, or the GL/Bank variance
/// exceeds the epsilon. Outputs were still written.
pub const EXIT_RECON_EXCEPTIONS: u8 = 3;

/// Some input rows could not be normalized (bad amount) and `--strict`
/// was given. Takes precedence over exit 3.
pub const EXIT_RECON_REJECTED: u8 = 4;

/// Run config failed to parse or validate.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 5;

/// Input unreadable, output unwritable, or engine invariant violation.
pub const EXIT_RECON_RUNTIME: u8 = 6;
