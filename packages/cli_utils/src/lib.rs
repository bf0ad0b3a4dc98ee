#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the phyto-map binaries.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, so log lines print above the progress bars
//! instead of tearing them. [`TerminalProgress`] adapts an `indicatif` bar
//! to [`ProgressCallback`].

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use phyto_map_measurement::progress::ProgressCallback;

pub use indicatif::MultiProgress;

const TICK: Duration = Duration::from_millis(100);

/// `indicatif` bar reporting through [`ProgressCallback`].
pub struct TerminalProgress {
    bar: ProgressBar,
    /// Applied when the length becomes known.
    counting_style: ProgressStyle,
}

impl TerminalProgress {
    /// Spinner for a record-level pass whose size is learned later; it turns
    /// into a counting bar on [`ProgressCallback::set_total`].
    #[must_use]
    pub fn records(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(TICK);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let counting_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {pos}/{len} records {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self {
            bar,
            counting_style,
        })
    }

    /// Bar over a fixed number of pipeline stages.
    #[must_use]
    pub fn stages(multi: &MultiProgress, message: &str, total: u64) -> Arc<dyn ProgressCallback> {
        let style = ProgressStyle::with_template(
            "{msg} {wide_bar:.green/dim} {pos}/{len} stages [{elapsed_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        let bar = multi.add(ProgressBar::new(total));
        bar.set_style(style.clone());
        bar.set_message(message.to_string());

        Arc::new(Self {
            bar,
            counting_style: style,
        })
    }
}

impl ProgressCallback for TerminalProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.counting_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger (filtered by `RUST_LOG`) and returns the
/// [`MultiProgress`] every bar must be added to.
///
/// A logger installed earlier, as happens across tests, is left in place.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
