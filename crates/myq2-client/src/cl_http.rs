// cl_http.rs -- HTTP asset download (similar to R1Q2)
//
// Downloading maps/models/sounds over HTTP instead of the in-game UDP
// protocol is a networking collaborator out of scope here; the async
// reqwest/tokio download pipeline is dropped and this keeps only the
// call surface cl_parse.rs uses, plus the pure helpers (URL building,
// path sanitization, progress/backoff math) that don't depend on it.

use std::path::{Path, PathBuf};

use myq2_common::common::com_printf;

/// Progress information for download callbacks
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub filename: String,
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
    pub bytes_per_second: u64,
}

/// Status of an async download
#[derive(Debug, Clone)]
pub enum AsyncDownloadStatus {
    InProgress(DownloadProgress),
    Completed,
    Failed(String),
    Cancelled,
    NotFound,
}

/// Initialize HTTP downloads with the given base URL. No-op: HTTP
/// downloading is not supported.
pub fn cl_http_init(base_url: &str) {
    if !base_url.is_empty() {
        com_printf("HTTP downloads are not supported.\n");
    }
}

/// Shutdown HTTP downloads (called on disconnect).
pub fn cl_http_shutdown() {}

/// Check if HTTP downloads are available. Always false.
pub fn cl_http_available() -> bool {
    false
}

/// Queue a file for download. Always unavailable.
pub fn cl_http_download(_filename: &str, _dest_path: &Path) -> Option<u64> {
    None
}

/// Poll for async download status updates. Always empty.
pub fn cl_http_poll() -> Vec<(u64, AsyncDownloadStatus)> {
    Vec::new()
}

// =============================================================================
// Pure helpers (kept: no dependency on the dropped download pipeline)
// =============================================================================

/// Build a download URL from a base URL and filename.
pub fn build_download_url(base_url: &str, filename: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let file = filename.trim_start_matches('/');
    format!("{}/{}", base, file)
}

/// Sanitize a download filename to prevent directory traversal.
pub fn sanitize_download_path(filename: &str) -> Option<String> {
    if filename.starts_with('/') || filename.starts_with('\\') {
        return None;
    }

    let normalized = filename.replace('\\', "/");
    for component in normalized.split('/') {
        if component == ".." {
            return None;
        }
    }

    if filename.len() >= 2 && filename.as_bytes()[1] == b':' {
        return None;
    }

    Some(normalized)
}

/// Calculate download progress percentage.
pub fn calculate_progress_percent(bytes_downloaded: u64, total_bytes: Option<u64>) -> i32 {
    match total_bytes {
        Some(total) if total > 0 => ((bytes_downloaded as f64 / total as f64) * 100.0) as i32,
        _ => 0,
    }
}

/// Calculate retry delay with exponential backoff, capped at max_delay_ms.
pub fn calculate_retry_delay(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> u64 {
    let delay = base_delay_ms.saturating_mul(1u64 << attempt.min(10));
    delay.min(max_delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_download_url_basic() {
        let url = build_download_url("http://example.com/q2", "maps/dm1.bsp");
        assert_eq!(url, "http://example.com/q2/maps/dm1.bsp");
    }

    #[test]
    fn test_build_download_url_trailing_slash() {
        let url = build_download_url("http://example.com/q2/", "maps/dm1.bsp");
        assert_eq!(url, "http://example.com/q2/maps/dm1.bsp");
    }

    #[test]
    fn test_sanitize_normal_path() {
        let result = sanitize_download_path("maps/dm1.bsp");
        assert_eq!(result, Some("maps/dm1.bsp".to_string()));
    }

    #[test]
    fn test_sanitize_rejects_absolute_path() {
        assert!(sanitize_download_path("/etc/passwd").is_none());
    }

    #[test]
    fn test_sanitize_rejects_directory_traversal() {
        assert!(sanitize_download_path("../../etc/passwd").is_none());
    }

    #[test]
    fn test_sanitize_rejects_drive_letter() {
        assert!(sanitize_download_path("C:\\windows\\system32").is_none());
    }

    #[test]
    fn test_progress_percent_half() {
        assert_eq!(calculate_progress_percent(50, Some(100)), 50);
    }

    #[test]
    fn test_progress_percent_unknown_total() {
        assert_eq!(calculate_progress_percent(500, None), 0);
    }

    #[test]
    fn test_retry_delay_exponential_growth() {
        assert_eq!(calculate_retry_delay(0, 500, 1_000_000), 500);
        assert_eq!(calculate_retry_delay(1, 500, 1_000_000), 1000);
        assert_eq!(calculate_retry_delay(2, 500, 1_000_000), 2000);
    }

    #[test]
    fn test_retry_delay_capped_at_max() {
        assert_eq!(calculate_retry_delay(20, 1000, 60000), 60000);
    }
}
