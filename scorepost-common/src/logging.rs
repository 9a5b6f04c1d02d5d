//! Span-per-direction logging macros and the process subscriber.
//!
//! Every crate in the workspace shares the `scorepost` target prefix, so one
//! directive covers all of them and a crate name narrows it:
//!
//! ```text
//! LOG_LEVEL=info                          # every scorepost crate at INFO
//! LOG_LEVEL=warn,scorepost_smtp=trace     # trace the SMTP client only
//! LOG_LEVEL=info,reqwest=debug            # let a dependency through too
//! ```

use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::Targets, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Target prefix shared by the `scorepost*` crates.
const WORKSPACE_TARGET: &str = "scorepost";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid log directive '{directive}'")]
pub struct FilterError {
    directive: String,
}

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:expr),*) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($msg),*)
    }};
}

/// Traffic leaving the process: delivery requests and notifications.
#[macro_export]
macro_rules! outgoing {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "outgoing", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::outgoing!(level = TRACE, $($msg),*)
    };
}

/// Work arriving from producers.
#[macro_export]
macro_rules! incoming {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "incoming", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::incoming!(level = TRACE, $($msg),*)
    };
}

#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::internal!(level = TRACE, $($msg),*)
    };
}

/// Build the event filter from a comma separated directive list.
///
/// A bare level applies to every `scorepost*` crate; `target=level` adds or
/// overrides a single target prefix. Targets outside the workspace stay off
/// unless named. `None` or an empty list yields `default` for the workspace.
///
/// # Errors
///
/// Returns the first directive whose level does not parse.
pub fn filter(directives: Option<&str>, default: LevelFilter) -> Result<Targets, FilterError> {
    let mut targets = Targets::new().with_target(WORKSPACE_TARGET, default);

    for directive in directives
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        let invalid = || FilterError {
            directive: directive.to_string(),
        };

        targets = match directive.split_once('=') {
            Some((target, level)) if !target.trim().is_empty() => targets.with_target(
                target.trim(),
                LevelFilter::from_str(level.trim()).map_err(|_| invalid())?,
            ),
            Some(_) => return Err(invalid()),
            None => targets.with_target(
                WORKSPACE_TARGET,
                LevelFilter::from_str(directive).map_err(|_| invalid())?,
            ),
        };
    }

    Ok(targets)
}

/// Install the global subscriber, filtered by `LOG_LEVEL`. Debug builds
/// default to TRACE and release builds to INFO.
pub fn init() {
    let default = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let directives = std::env::var("LOG_LEVEL").ok();
    let targets = filter(directives.as_deref(), default).unwrap_or_else(|err| {
        // No subscriber yet, so stderr is the only place this can go
        eprintln!("{err}, logging at {default}");
        Targets::new().with_target(WORKSPACE_TARGET, default)
    });

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(targets),
        )
        .init();
}
