//! Progress bar utilities for extraction.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a progress bar counting extracted samples.
pub fn create_sample_progress(
    total_samples: u64,
    file_name: &str,
    enabled: bool,
) -> Option<ProgressBar> {
    if !enabled || total_samples == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_samples);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] {{bar:40.cyan/blue}} {{pos}}/{{len}} samples ({{eta}}) - {file_name}"
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Advance a progress bar by `samples`.
pub fn inc_progress(pb: Option<&ProgressBar>, samples: u64) {
    if let Some(pb) = pb {
        pb.inc(samples);
    }
}
