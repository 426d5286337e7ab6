use crate::error::AutosizeError;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Density {
    Single,
    Double,
    Triple,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageReference {
    pub raw_path: String,
    pub density: Density,
}

// Extracts the first url() reference of a declaration value, optionally
// restricted to a set of allowed path prefixes.
pub(crate) struct ReferenceMatcher {
    url_pattern: Regex,
}

impl ReferenceMatcher {
    pub fn new(image_path: &[String]) -> Result<Self, AutosizeError> {
        let prefix = if image_path.is_empty() {
            String::new()
        } else {
            // Allow-list entries are literal path fragments; escaping keeps a
            // `.` in an entry from matching arbitrary characters.
            let alternatives: Vec<String> = image_path
                .iter()
                .map(|entry| format!("{}/", regex::escape(entry)))
                .collect();
            format!("(?:{})", alternatives.join("|"))
        };
        let pattern = format!("url\\([\"']?({}[^)]*?)[\"']?\\)", prefix);
        let url_pattern = Regex::new(&pattern).map_err(|err| {
            AutosizeError::InvalidConfiguration(format!(
                "image_path produced an unusable pattern: {err}"
            ))
        })?;
        Ok(Self { url_pattern })
    }

    // Single-shot: only the first url() occurrence is considered. Embedded
    // data URIs and absolute network URLs are not references to local files,
    // so they yield no match at all rather than a failed lookup.
    pub fn first_reference(&self, value: &str) -> Option<ImageReference> {
        let captures = self.url_pattern.captures(value)?;
        let raw = captures.get(1)?.as_str();
        if raw.starts_with("data:") {
            return None;
        }
        if raw.starts_with("//") || raw.starts_with("http://") || raw.starts_with("https://") {
            return None;
        }
        Some(ImageReference {
            raw_path: raw.to_string(),
            // The density marker is looked up in the whole value, not just the
            // matched filename. A marker elsewhere in a multi-background value
            // triggers scaling too; kept for compatibility.
            density: detect_density(value),
        })
    }
}

fn detect_density(value: &str) -> Density {
    if value.contains("@2x") {
        Density::Double
    } else if value.contains("@3x") {
        Density::Triple
    } else {
        Density::Single
    }
}
