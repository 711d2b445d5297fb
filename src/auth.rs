use crate::error::CliError;

// Shared floor secret for the editing surface. Gates edit/delete only;
// appends are open, matching the paper workflow it replaced.
const DEFAULT_ADMIN_PASSWORD: &str = "D0nderd@g18!";

fn expected_password() -> String {
    std::env::var("OEE_ADMIN_PASSWORD")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string())
}

/// Plain-text comparison against the shared secret. Wrong or missing
/// password refuses the mutation before anything is loaded or written.
pub fn verify_password(given: Option<&str>) -> Result<(), CliError> {
    match given {
        Some(p) if p == expected_password() => Ok(()),
        Some(_) => Err(CliError::denied("Incorrect password")),
        None => Err(CliError::denied(
            "Editing stored records requires --password",
        )),
    }
}
