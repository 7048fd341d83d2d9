use std::path::Path;

use chrono::Utc;
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Item id: `<unix-millis>_<0..10000>`. Uniqueness is best-effort; callers
/// that need it check against the loaded collection.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    format!("{}_{}", Utc::now().timestamp_millis(), rng.gen_range(0..10_000))
}

/// On-disk name for an uploaded photo: `<unix-millis>-<6 base36 chars>-<original>`.
pub fn upload_file_name(original: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        suffix,
        sanitize_original(original)
    )
}

/// Keep only the final path component of a client-supplied file name.
fn sanitize_original(original: &str) -> String {
    let last = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let name = Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == ".." {
        "upload".to_string()
    } else {
        name.to_string()
    }
}
