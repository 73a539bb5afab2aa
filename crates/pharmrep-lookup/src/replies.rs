//! Assistant reply texts for the doctor lookup chat.

use pharmrep_core::models::{Doctor, DoctorSearchResult};

use crate::query::LookupQuery;

/// First message shown when a session opens.
pub const GREETING: &str = "Hi! Ask me about a doctor by name, specialty or city, \
for example \"cardiologist in Giza\" or \"Dr. Mona Adel\".";

/// Reply when the message contained nothing to search for.
pub const EMPTY_QUERY_REPLY: &str =
    "Tell me a doctor's name, specialty or city and I'll look them up.";

/// Reply when the search found nobody.
pub const NO_RESULTS_REPLY: &str = "I couldn't find any doctors matching that. \
Try a different spelling, or search by specialty or city.";

/// Doctors listed in one reply.
pub const DISPLAY_LIMIT: usize = 5;

/// Recent visits listed per doctor.
pub const VISITS_PER_DOCTOR: usize = 2;

/// Summarise a search: found doctors, their latest visits, and the totals.
///
/// `doctors` is the filtered subset of `result.found_doctors` to show.
pub fn render_reply(query: &LookupQuery, result: &DoctorSearchResult, doctors: &[&Doctor]) -> String {
    if doctors.is_empty() {
        return NO_RESULTS_REPLY.to_string();
    }

    let mut reply = format!(
        "Found {} {}{}:\n",
        doctors.len(),
        if doctors.len() == 1 { "doctor" } else { "doctors" },
        describe_query(query)
    );

    for (index, doctor) in doctors.iter().take(DISPLAY_LIMIT).enumerate() {
        reply.push_str(&format!("{}. {}", index + 1, doctor.display_label()));
        if let Some(org) = doctor.organization.as_deref().filter(|o| !o.is_empty()) {
            reply.push_str(&format!(" - {}", org));
        }
        reply.push('\n');

        let visits = result.visits_for(&doctor.id);
        if visits.is_empty() {
            reply.push_str("   No visits on record\n");
        }
        for visit in visits.iter().take(VISITS_PER_DOCTOR) {
            reply.push_str(&format!("   Visited {}", visit.visit_date));
            if let Some(rep) = visit.rep_name.as_deref() {
                reply.push_str(&format!(" by {}", rep));
            }
            if !visit.products.is_empty() {
                reply.push_str(&format!(" ({})", visit.products.join(", ")));
            }
            reply.push('\n');
        }
    }

    if doctors.len() > DISPLAY_LIMIT {
        reply.push_str(&format!("...and {} more\n", doctors.len() - DISPLAY_LIMIT));
    }

    reply.push_str(&format!(
        "Total: {} doctors, {} visits",
        result.statistics.total_doctors, result.statistics.total_visits
    ));
    reply
}

/// Reply for a failed search. `message` comes from `LookupError::user_message`,
/// which keeps only one capped line of any server text.
pub fn render_error(message: &str) -> String {
    format!("Sorry, the doctor search failed: {}. Please try again.", message)
}

fn describe_query(query: &LookupQuery) -> String {
    let mut parts = Vec::new();
    if !query.terms.is_empty() {
        parts.push(format!("named \"{}\"", query.terms.join(" ")));
    }
    if let Some(specialty) = &query.specialty {
        parts.push(format!("in {}", specialty));
    }
    if let Some(city) = &query.city {
        parts.push(format!("near {}", city));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" {}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;
    use serde_json::json;

    fn search_result() -> DoctorSearchResult {
        serde_json::from_value(json!({
            "foundDoctors": [
                {"id": "d1", "name": "Mona Adel", "specialty": "Cardiology", "city": "Giza",
                 "organization": "Dar El Fouad"},
                {"id": "d2", "name": "Karim Nabil", "specialty": "Cardiology", "city": "Giza"}
            ],
            "searchQuery": "Cardiology",
            "statistics": {"totalDoctors": 2, "totalVisits": 3},
            "visits": [
                {"doctorId": "d1", "visitDate": "2024-03-01", "repName": "Omar", "products": ["Concor"]},
                {"doctorId": "d1", "visitDate": "2024-04-10", "repName": "Omar"},
                {"doctorId": "d1", "visitDate": "2024-01-15"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_reply_lists_doctors_and_latest_visits() {
        let result = search_result();
        let doctors: Vec<&Doctor> = result.found_doctors.iter().collect();
        let reply = render_reply(&parse_query("cardiologist in Giza"), &result, &doctors);

        assert!(reply.starts_with("Found 2 doctors in Cardiology near Giza:"));
        assert!(reply.contains("1. Mona Adel (Cardiology, Giza) - Dar El Fouad"));
        // Most recent first, capped per doctor
        let first = reply.find("2024-04-10").unwrap();
        let second = reply.find("2024-03-01").unwrap();
        assert!(first < second);
        assert!(!reply.contains("2024-01-15"));
        assert!(reply.contains("(Concor)"));
        assert!(reply.contains("2. Karim Nabil (Cardiology, Giza)\n   No visits on record"));
        assert!(reply.ends_with("Total: 2 doctors, 3 visits"));
    }

    #[test]
    fn test_no_doctors_uses_fixed_reply() {
        let result = DoctorSearchResult::default();
        assert_eq!(render_reply(&parse_query("Nobody"), &result, &[]), NO_RESULTS_REPLY);
    }

    #[test]
    fn test_overflow_note() {
        let mut result = DoctorSearchResult::default();
        for i in 0..7 {
            result.found_doctors.push(Doctor {
                id: format!("d{}", i),
                name: format!("Doctor {}", i),
                specialty: None,
                organization: None,
                city: None,
                area: None,
            });
        }
        let doctors: Vec<&Doctor> = result.found_doctors.iter().collect();
        let reply = render_reply(&parse_query("Doctor"), &result, &doctors);
        assert!(reply.contains("5. Doctor 4"));
        assert!(!reply.contains("6. Doctor 5"));
        assert!(reply.contains("...and 2 more"));
    }
}
