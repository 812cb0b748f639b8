use serde::{Deserialize, Deserializer, Serialize};

/// One enrolled person. Only `id` is required; every descriptive field may
/// be missing and the core never edits any of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(deserialize_with = "deserialize_person_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl Person {
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        match (first.is_empty(), last.is_empty()) {
            (false, false) => format!("{} {}", first, last),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (true, true) => self.id.clone(),
        }
    }

    /// Avatar fallback when no photo is available: first letters of first and
    /// last name.
    pub fn initials(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(|s| s.trim().chars().next())
            .collect()
    }
}

/// Person ids arrive either as JSON strings or integers.
pub fn deserialize_person_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    person_id_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom("person id must be a string or integer"))
}

pub fn person_id_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

// Latin letters carrying the diacritics common in Spanish and Portuguese
// rosters, folded to their base letter.
fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

fn fold(s: &str) -> String {
    s.to_lowercase().chars().map(fold_char).collect()
}

fn name_matches(field: Option<&str>, needle: &str) -> bool {
    field.map(|v| fold(v).contains(needle)).unwrap_or(false)
}

/// Free-text roster filter. A blank query returns every person in roster
/// order; otherwise a person matches when the query is found in the first
/// name, the last name (both case and accent insensitive) or the document
/// number (compared as written).
pub fn filter<'a>(people: &'a [Person], query: &str) -> Vec<&'a Person> {
    if query.trim().is_empty() {
        return people.iter().collect();
    }
    let lowered = query.to_lowercase();
    let needle = fold(query);
    people
        .iter()
        .filter(|p| {
            name_matches(p.first_name.as_deref(), &needle)
                || name_matches(p.last_name.as_deref(), &needle)
                || p
                    .document_number
                    .as_deref()
                    .map(|d| d.contains(lowered.as_str()))
                    .unwrap_or(false)
        })
        .collect()
}

/// Resolves a photo reference into something a client can display.
/// Absolute URLs pass through; relative references are joined onto `base`.
pub fn media_url(base: &str, photo: &str) -> String {
    let photo = photo.trim();
    if base.is_empty() || photo.starts_with("http://") || photo.starts_with("https://") {
        return photo.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        photo.trim_start_matches('/')
    )
}
