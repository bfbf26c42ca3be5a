use simple_error::{SimpleResult, bail};

fn check_existing_file(filename: &str, label: &str) -> SimpleResult<()> {
    let path = std::path::Path::new(&filename);
    if !path.exists() {
        bail!("Can't find specified {label} file: '{filename}'");
    }
    if !path.is_file() {
        bail!("Specified {label} file path does not appear to be a file: '{filename}'");
    }
    Ok(())
}

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &str, label: &str) -> SimpleResult<()> {
    if filename.is_empty() {
        bail!("Must specify {label} file");
    }
    check_existing_file(filename, label)
}

/// Check an optional input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_optional_filename(filename_opt: Option<&str>, label: &str) -> SimpleResult<()> {
    match filename_opt {
        Some(filename) => check_existing_file(filename, label),
        None => Ok(()),
    }
}
