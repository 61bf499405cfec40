use std::time::Duration;

/// Fixed-duration pause for asynchronous rendering to finish.
///
/// All render-latency tolerance in the crate goes through this single
/// primitive so it can later be swapped for a condition-based wait without
/// touching call sites.
pub async fn settle(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    ::log::trace!("settling for {:?}", duration);
    tokio::time::sleep(duration).await;
}

/// Convert a string to a sanitized filename stem.
pub fn sanitize_filename(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    sanitized = sanitized.trim().to_string();

    // Limit filename length; char-based so multibyte names stay valid.
    if sanitized.chars().count() > 100 {
        sanitized = sanitized.chars().take(100).collect();
    }
    if sanitized.is_empty() {
        sanitized.push('_');
    }
    sanitized
}
