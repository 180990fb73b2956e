//! Program filter: short group names expand to name keywords.

/// Group name -> keywords matched against the upper-cased program name.
pub const PROGRAM_ALIASES: &[(&str, &[&str])] = &[
    ("ECE", &["ELECTRONICS AND COMMUNICATION"]),
    ("CSE", &["COMPUTER SCIENCE AND ENGINEERING"]),
    ("MECH", &["MECHANICAL ENGINEERING"]),
    ("CIVIL", &["CIVIL ENGINEERING"]),
    ("EEE", &["ELECTRICAL AND ELECTRONICS"]),
    ("IT", &["INFORMATION TECHNOLOGY"]),
    ("AI", &["ARTIFICIAL INTELLIGENCE"]),
    ("AIDS", &["ARTIFICIAL INTELLIGENCE AND DATA SCIENCE"]),
    ("AIML", &["AI AND MACHINE LEARNING"]),
    ("BME", &["BIO MEDICAL ENGINEERING", "BIOMEDICAL"]),
    ("CHEM", &["CHEMICAL ENGINEERING"]),
    ("AUTO", &["AUTOMOBILE ENGINEERING"]),
    ("AERO", &["AERONAUTICAL ENGINEERING"]),
    ("BIOTECH", &["BIO TECHNOLOGY", "BIOTECHNOLOGY"]),
    ("CSBS", &["COMPUTER SCIENCE AND BUSSINESS SYSTEM", "COMPUTER SCIENCE AND BUSINESS"]),
    ("CSD", &["COMPUTER SCIENCE AND DESIGN"]),
    ("FOOD", &["FOOD TECHNOLOGY"]),
    ("AGRI", &["AGRICULTURAL ENGINEERING"]),
    ("MARINE", &["MARINE ENGINEERING"]),
    ("MINING", &["MINING ENGINEERING"]),
    ("TEXTILE", &["TEXTILE TECHNOLOGY"]),
    ("PRINTING", &["PRINTING"]),
    ("ROBOTICS", &["ROBOTICS"]),
    ("CYBER", &["CYBER SECURITY"]),
    ("IOT", &["INTERNET OF THINGS"]),
    ("MECHATRONICS", &["MECHATRONICS"]),
    (
        "CORE",
        &[
            "ELECTRONICS AND COMMUNICATION",
            "ELECTRICAL AND ELECTRONICS",
            "MECHANICAL ENGINEERING",
            "CIVIL ENGINEERING",
        ],
    ),
    ("CS GROUP", CS_GROUP),
    ("CS", CS_GROUP),
];

const CS_GROUP: &[&str] = &[
    "COMPUTER SCIENCE",
    "INFORMATION TECHNOLOGY",
    "ARTIFICIAL INTELLIGENCE",
    "CYBER",
    "DATA SCIENCE",
    "COMPUTING",
    "MACHINE LEARNING",
    "IOT",
];

/// Normalized program filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramFilter {
    /// A known group: any keyword in the program name matches.
    Group { name: String, keywords: &'static [&'static str] },
    /// Free text: name substring, or exact program code.
    Text(String),
}

impl ProgramFilter {
    /// `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let query = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        if query.is_empty() {
            return None;
        }
        let filter = match PROGRAM_ALIASES.iter().find(|(name, _)| *name == query) {
            Some((_, keywords)) => ProgramFilter::Group {
                name: query,
                keywords: *keywords,
            },
            None => ProgramFilter::Text(query),
        };
        Some(filter)
    }

    pub fn matches(&self, program_code: &str, program_name: &str) -> bool {
        let name = program_name.to_uppercase();
        match self {
            ProgramFilter::Group { keywords, .. } => keywords.iter().any(|kw| name.contains(kw)),
            ProgramFilter::Text(text) => {
                name.contains(text.as_str()) || program_code.trim().eq_ignore_ascii_case(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_expand_to_keywords() {
        let cs = ProgramFilter::parse(" cs ").expect("non-blank");
        assert!(cs.matches("AD", "Artificial Intelligence and Data Science"));
        assert!(cs.matches("IT", "Information Technology"));
        assert!(!cs.matches("ME", "Mechanical Engineering"));

        let core = ProgramFilter::parse("core").expect("non-blank");
        assert!(core.matches("EC", "Electronics and Communication Engineering"));
        assert!(!core.matches("CS", "Computer Science and Engineering"));

        let group = ProgramFilter::parse("cs   group").expect("non-blank");
        assert!(matches!(group, ProgramFilter::Group { .. }));
    }

    #[test]
    fn free_text_matches_name_or_code() {
        let text = ProgramFilter::parse("xm").expect("non-blank");
        assert!(text.matches("XM", "Some Program"));
        assert!(!text.matches("XMA", "Other Program"));

        let text = ProgramFilter::parse("chemical").expect("non-blank");
        assert!(text.matches("CH", "Chemical Engineering"));
    }

    #[test]
    fn blank_filter_is_none() {
        assert_eq!(ProgramFilter::parse("   "), None);
    }
}
