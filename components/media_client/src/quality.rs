use media_protocol::FormatEntry;

/// First number in a quality label (`"720p60"` -> 720), 0 when there is none
pub fn resolution_number(label: &str) -> u32 {
    label
        .split(|c: char| !c.is_ascii_digit())
        .find(|digits| !digits.is_empty())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

/// Distinct labels of muxed formats, highest resolution first
pub fn quality_options(formats: &[FormatEntry]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for format in formats.iter().filter(|f| f.is_muxed()) {
        if !format.quality.is_empty() && !labels.contains(&format.quality) {
            labels.push(format.quality.clone());
        }
    }
    labels.sort_by_key(|label| std::cmp::Reverse(resolution_number(label)));
    labels
}

/// Selector of the first muxed format carrying `label`
pub fn selector_for<'a>(formats: &'a [FormatEntry], label: &str) -> Option<&'a str> {
    formats
        .iter()
        .find(|f| f.is_muxed() && f.quality == label)
        .map(|f| f.itag.as_str())
}
