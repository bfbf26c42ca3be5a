use clap::Args;
use simple_error::{SimpleResult, bail};

use super::defaults::DEFAULT_THREAD_COUNT;

#[derive(Args)]
pub struct SharedSettings {
    /// Number of threads to use. Defaults to the smaller of 2 and the number of logical cpus detected.
    #[arg(long = "threads", global = true, value_name = "THREAD_COUNT")]
    thread_count_option: Option<usize>,

    /// This value will be filled in by thread_count_option
    #[arg(hide = true, default_value_t = 0)]
    pub thread_count: usize,

    /// Overwrite an existing output directory
    #[arg(long, global = true)]
    pub clobber: bool,

    /// Turn on extra debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

pub fn validate_and_fix_shared_settings(
    mut settings: SharedSettings,
) -> SimpleResult<SharedSettings> {
    settings.thread_count = match settings.thread_count_option {
        Some(count) => {
            if count == 0 {
                bail!("--threads argument must be greater than 0");
            }
            count
        }
        None => std::cmp::min(DEFAULT_THREAD_COUNT, num_cpus::get()),
    };

    Ok(settings)
}
