//! Verbosity-gated logging for the compiler pipeline.
//!
//! Messages go to stderr and cost a single comparison when disabled.
//! Levels:
//! - 0: SILENT
//! - 1: PHASES (pipeline phase boundaries, soft compilation errors)
//! - 2: DECISIONS (resource assignments, graph rewrites)
//! - 3: DEBUG (per-node pass internals)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_PHASES: u8 = 1;
pub const VERBOSITY_DECISIONS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at PHASES level (verbosity >= 1).
#[macro_export]
macro_rules! log_phase {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_PHASES {
            eprintln!("[compile] {}", format_args!($($arg)*));
        }
    };
}

/// Log at DECISIONS level (verbosity >= 2).
///
/// Used for: which resource an activity landed on, removed edges, merged events.
#[macro_export]
macro_rules! log_decision {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DECISIONS {
            eprintln!("[compile]   {}", format_args!($($arg)*));
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!("[compile]     {}", format_args!($($arg)*));
        }
    };
}
