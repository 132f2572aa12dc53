pub fn sanitize_filename(filename: &str) -> String {
    // Characters that are invalid in file names on at least one platform
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Caps a display name at `max` characters.
pub fn limit_string(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Fills the artist placeholders of a folder naming template.
pub fn apply_artist_folder(template: &str, artist_name: &str, artist_id: &str, limit_max: usize) -> String {
    template
        .replace("{UrlArtistName}", &limit_string(artist_name, limit_max))
        .replace("{ArtistId}", artist_id)
}

/// Folder for music videos: the artist template with its placeholders blanked.
pub fn music_video_folder(template: &str) -> Option<String> {
    let folder = template
        .replace("{ArtistName}", "")
        .replace("{UrlArtistName}", "")
        .replace("{ArtistId}", "");
    if folder.is_empty() {
        None
    } else {
        Some(sanitize_filename(&folder))
    }
}

/// Parses a selection like `1,3-5` or `all` into zero-based indices.
///
/// Out-of-range and malformed parts are ignored; the result is sorted and
/// free of duplicates.
pub fn parse_selection(input: &str, len: usize) -> Vec<usize> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return (0..len).collect();
    }

    let mut picked = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (a.trim().parse::<usize>(), b.trim().parse::<usize>()),
            None => (part.parse::<usize>(), part.parse::<usize>()),
        };
        if let (Ok(start), Ok(end)) = (start, end) {
            for n in start.max(1)..=end.min(len) {
                picked.push(n - 1);
            }
        }
    }
    picked.sort_unstable();
    picked.dedup();
    picked
}
