use crate::protocol::OutputKind;

/// Reduce a video title to ASCII word characters and single spaces
///
/// The result is safe to embed in a quoted `Content-Disposition` filename.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        "download".to_string()
    } else {
        collapsed
    }
}

/// Generate the attachment filename for a download of the given kind
pub fn attachment_filename(title: &str, kind: OutputKind) -> String {
    format!("{}.{}", sanitize_title(title), kind.extension())
}
