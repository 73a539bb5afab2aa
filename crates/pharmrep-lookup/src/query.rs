//! Free-text doctor query parsing.

use serde::{Deserialize, Serialize};

use pharmrep_core::models::Doctor;

/// Structured form of a chat message like "cardiologist named Hassan in Giza".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LookupQuery {
    /// Remaining name words, original casing
    pub terms: Vec<String>,
    /// Canonical specialty (see [`SPECIALTIES`])
    pub specialty: Option<String>,
    pub city: Option<String>,
}

impl LookupQuery {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.specialty.is_none() && self.city.is_none()
    }

    /// Text sent to the search endpoint: name terms, else specialty, else city.
    pub fn search_text(&self) -> Option<String> {
        if !self.terms.is_empty() {
            return Some(self.terms.join(" "));
        }
        self.specialty.clone().or_else(|| self.city.clone())
    }

    /// Client-side filter on specialty and city, case-insensitive.
    ///
    /// Doctors with no value recorded for a field are not excluded by it.
    pub fn matches(&self, doctor: &Doctor) -> bool {
        let specialty_ok = match (&self.specialty, &doctor.specialty) {
            (Some(wanted), Some(actual)) => {
                canonical_specialty(actual).map_or(false, |c| c == wanted.as_str())
                    || actual.eq_ignore_ascii_case(wanted)
            }
            _ => true,
        };
        let city_ok = match (&self.city, &doctor.city) {
            (Some(wanted), Some(actual)) => actual.to_lowercase().contains(&wanted.to_lowercase()),
            _ => true,
        };
        specialty_ok && city_ok
    }
}

/// Canonical specialty names with the words that point at them.
pub const SPECIALTIES: &[(&str, &[&str])] = &[
    ("Cardiology", &["cardiologist", "cardiology", "cardiac", "heart"]),
    ("Pediatrics", &["pediatrician", "paediatrician", "pediatrics", "paediatrics", "children"]),
    ("Dermatology", &["dermatologist", "dermatology", "skin"]),
    ("Orthopedics", &["orthopedist", "orthopedic", "orthopaedic", "orthopedics", "bones"]),
    ("Neurology", &["neurologist", "neurology"]),
    ("Gynecology", &["gynecologist", "gynaecologist", "gynecology", "obgyn"]),
    ("Ophthalmology", &["ophthalmologist", "ophthalmology", "eyes"]),
    ("ENT", &["ent", "otolaryngologist"]),
    ("Internal Medicine", &["internist", "internal"]),
    ("Dentistry", &["dentist", "dental"]),
    ("Psychiatry", &["psychiatrist", "psychiatry"]),
    ("Urology", &["urologist", "urology"]),
    ("Oncology", &["oncologist", "oncology"]),
    ("General Practice", &["gp", "practitioner"]),
];

/// Words that carry no search meaning.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "any", "all", "find", "search", "show", "list", "get", "look", "up", "for",
    "me", "my", "please", "who", "is", "are", "named", "called", "with", "of", "at", "and",
    "dr", "doctor", "doctors", "physician", "visits", "visit", "info", "about", "i", "need", "in",
];

/// Typos shorter than this are not fuzzy-matched against specialties.
const FUZZY_MIN_LEN: usize = 6;
const FUZZY_THRESHOLD: f64 = 0.92;

/// Map a word or specialty label to its canonical specialty.
pub fn canonical_specialty(word: &str) -> Option<&'static str> {
    let lower = word.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    for (canonical, aliases) in SPECIALTIES {
        if canonical.to_lowercase() == lower || aliases.contains(&lower.as_str()) {
            return Some(*canonical);
        }
    }

    // Misspellings like "cardiolgist"
    if lower.chars().count() >= FUZZY_MIN_LEN {
        let best = SPECIALTIES
            .iter()
            .flat_map(|(canonical, aliases)| aliases.iter().map(move |a| (*canonical, *a)))
            .map(|(canonical, alias)| (canonical, strsim::jaro_winkler(&lower, alias)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((canonical, score)) = best {
            if score >= FUZZY_THRESHOLD {
                return Some(canonical);
            }
        }
    }
    None
}

/// Parse a chat message into a [`LookupQuery`].
///
/// "in X" sets the city (X runs to the next keyword), specialty words set
/// the specialty, and whatever is left are name terms.
pub fn parse_query(text: &str) -> LookupQuery {
    let tokens = tokenize(text);
    let mut query = LookupQuery::default();
    let mut city_words: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let lower = token.to_lowercase();

        if lower == "in" && query.city.is_none() {
            i += 1;
            while i < tokens.len() {
                let next = tokens[i].as_str();
                let next_lower = next.to_lowercase();
                if is_stopword(&next_lower) || canonical_specialty(&next_lower).is_some() {
                    break;
                }
                city_words.push(next);
                i += 1;
            }
            if !city_words.is_empty() {
                query.city = Some(title_case(&city_words.join(" ")));
            }
            continue;
        }

        if is_stopword(&lower) {
            i += 1;
            continue;
        }

        if query.specialty.is_none() {
            if let Some(canonical) = canonical_specialty(&lower) {
                query.specialty = Some(canonical.to_string());
                i += 1;
                continue;
            }
        }

        query.terms.push(token.to_string());
        i += 1;
    }

    tracing::debug!(
        terms = query.terms.len(),
        specialty = ?query.specialty,
        city = ?query.city,
        "Parsed lookup query"
    );
    query
}

/// Split on anything that is not a letter, digit, hyphen or apostrophe.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .map(|t| t.trim_matches(|c| c == '-' || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_stopword(lower: &str) -> bool {
    STOPWORDS.contains(&lower)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
