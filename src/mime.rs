use std::path::Path;

const FALLBACK_TYPE: &str = "application/octet-stream";

fn type_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" | "map" => "application/json",
        "xml" => "text/xml",
        "rss" => "application/rss+xml",
        "atom" => "application/atom+xml",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "webmanifest" => "application/manifest+json",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        _ => return None,
    };
    Some(mime)
}

/// Content type sent with an upload, always tagged `; charset=utf-8`.
pub fn content_type_for(path: &Path) -> String {
    let mime = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| type_for_extension(&ext.to_ascii_lowercase()))
        .unwrap_or_else(|| {
            tracing::debug!(
                "No content type known for {}, falling back to {}",
                path.display(),
                FALLBACK_TYPE
            );
            FALLBACK_TYPE
        });
    format!("{}; charset=utf-8", mime)
}
