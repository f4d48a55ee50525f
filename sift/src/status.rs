//! Response status classification

use reqwest::StatusCode;

/// Status names that count as a successful search. `CREATE`/`CREATED` show up
/// when the target index was auto-created as a side effect of the query.
const SUCCESS_STATUSES: [&str; 3] = ["OK", "CREATED", "CREATE"];

/// Engine-style status name: canonical reason upper-cased, spaces as underscores.
///
/// `200` → `OK`, `201` → `CREATED`, `404` → `NOT_FOUND`.
pub fn status_name(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason.to_ascii_uppercase().replace([' ', '-'], "_"),
        None => status.as_u16().to_string(),
    }
}

/// Whether a status name denotes success
pub fn is_success(status_name: &str) -> bool {
    SUCCESS_STATUSES.contains(&status_name)
}
