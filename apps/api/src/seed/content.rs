//! Reference content for the Vaccine Lot Release (VLR) framework.

pub struct LevelSeed {
    pub number: i32,
    pub name: &'static str,
    pub description: &'static str,
    pub benchmark: f64,
}

pub const LEVELS: &[LevelSeed] = &[
    LevelSeed {
        number: 1,
        name: "Foundation",
        description: "Understands core concepts; can perform tasks with guidance",
        benchmark: 50.0,
    },
    LevelSeed {
        number: 2,
        name: "Advanced",
        description: "Applies knowledge independently; handles standard situations",
        benchmark: 70.0,
    },
    LevelSeed {
        number: 3,
        name: "Expert",
        description: "Leads others; handles complex scenarios; shapes policy",
        benchmark: 85.0,
    },
];

pub const DOMAIN_CODE: &str = "VLR";
pub const DOMAIN_NAME: &str = "Vaccine Lot Release Regulation";
pub const DOMAIN_DESCRIPTION: &str = "Competencies for regulatory assessment and lot release of vaccines";
pub const FRAMEWORKS: &[&str] = &["WHO TRS 978 Annex 2", "SAHPGL-PEM-BIO-01", "ICH Q9", "PIC/S"];

/// `(code, name, description)`; sort order follows position.
pub const AREAS: &[(&str, &str, &str)] = &[
    ("VLR-01", "Vaccine Platforms & Technologies", "Understanding of vaccine platform types and manufacturing principles"),
    ("VLR-02", "Upstream Processing", "Cell culture, fermentation, and upstream manufacturing processes"),
    ("VLR-03", "Downstream Processing", "Purification, clarification, and viral clearance processes"),
    ("VLR-04", "Formulation & Fill-Finish", "Aseptic processing, fill-finish operations, and contamination control"),
    ("VLR-05", "Critical Quality Attributes (CQAs)", "Assessment of product quality attributes and specifications"),
    ("VLR-06", "Critical Process Parameters (CPPs)", "Process control, monitoring, and deviation management"),
    ("VLR-07", "Lot Summary Protocol (LSP) Review", "Review and evaluation of manufacturing documentation"),
    ("VLR-08", "Regulatory Decision-Making", "Risk-based decision frameworks and regulatory actions"),
    ("VLR-09", "Quality by Design (QbD)", "QbD principles, design space, and lifecycle management"),
    ("VLR-10", "International Regulatory Harmonization", "Global regulatory frameworks and reliance pathways"),
];

/// `(level, code, description)`. The area is the code's first two segments.
pub const ITEMS: &[(i32, &str, &str)] = &[
    (1, "VLR-01-L1-01", "Identify traditional vaccine platform types (live attenuated, inactivated, subunit, conjugate)"),
    (1, "VLR-01-L1-02", "Describe basic manufacturing principles per platform"),
    (2, "VLR-01-L2-01", "Compare manufacturing processes across platforms"),
    (2, "VLR-01-L2-02", "Evaluate platform-specific quality considerations"),
    (3, "VLR-01-L3-01", "Assess emerging technology regulatory implications (mRNA, viral vector)"),
    (3, "VLR-01-L3-02", "Design platform-specific regulatory strategies"),
    (1, "VLR-02-L1-01", "Describe cell culture and fermentation fundamentals"),
    (1, "VLR-02-L1-02", "Identify critical upstream parameters (temperature, pH, DO, agitation)"),
    (2, "VLR-02-L2-01", "Analyze bioreactor data for compliance"),
    (2, "VLR-02-L2-02", "Evaluate cell line qualification documentation"),
    (3, "VLR-02-L3-01", "Assess upstream deviation impact on product quality"),
    (3, "VLR-02-L3-02", "Design risk-based upstream monitoring strategies"),
    (1, "VLR-03-L1-01", "Describe purification and clarification methods"),
    (1, "VLR-03-L1-02", "Identify downstream critical process parameters"),
    (2, "VLR-03-L2-01", "Analyze chromatography and filtration data"),
    (2, "VLR-03-L2-02", "Evaluate viral clearance validation studies"),
    (3, "VLR-03-L3-01", "Assess downstream process changes and comparability"),
    (3, "VLR-03-L3-02", "Design process validation strategies"),
    (1, "VLR-04-L1-01", "Describe aseptic processing requirements"),
    (1, "VLR-04-L1-02", "Identify fill-finish critical parameters"),
    (2, "VLR-04-L2-01", "Evaluate environmental monitoring data"),
    (2, "VLR-04-L2-02", "Analyze container closure integrity data"),
    (3, "VLR-04-L3-01", "Assess facility and equipment qualification"),
    (3, "VLR-04-L3-02", "Design contamination control strategies"),
    (1, "VLR-05-L1-01", "Define CQA tiers and their significance"),
    (1, "VLR-05-L1-02", "Identify Tier 1 safety-critical CQAs"),
    (2, "VLR-05-L2-01", "Interpret CQA test results and specifications"),
    (2, "VLR-05-L2-02", "Evaluate OOS results and their implications"),
    (3, "VLR-05-L3-01", "Assess CQA-CPP relationships"),
    (3, "VLR-05-L3-02", "Design risk-based CQA assessment strategies"),
    (1, "VLR-06-L1-01", "Define CPPs and their relationship to CQAs"),
    (1, "VLR-06-L1-02", "Identify stage-specific CPPs"),
    (2, "VLR-06-L2-01", "Analyze CPP trends and control charts"),
    (2, "VLR-06-L2-02", "Evaluate process deviation impact"),
    (3, "VLR-06-L3-01", "Assess design space and process robustness"),
    (3, "VLR-06-L3-02", "Design CPP monitoring strategies"),
    (1, "VLR-07-L1-01", "Identify LSP components (WHO TRS 978 Annex 2)"),
    (1, "VLR-07-L1-02", "Navigate LSP documentation structure"),
    (2, "VLR-07-L2-01", "Evaluate manufacturing summary data"),
    (2, "VLR-07-L2-02", "Assess quality control test results"),
    (3, "VLR-07-L3-01", "Integrate LSP review with risk assessment"),
    (3, "VLR-07-L3-02", "Make evidence-based lot release decisions"),
    (1, "VLR-08-L1-01", "Describe lot release decision categories"),
    (1, "VLR-08-L1-02", "Identify documentation requirements"),
    (2, "VLR-08-L2-01", "Apply risk-based decision frameworks"),
    (2, "VLR-08-L2-02", "Evaluate conditional release scenarios"),
    (3, "VLR-08-L3-01", "Balance public health needs with quality assurance"),
    (3, "VLR-08-L3-02", "Design decision escalation procedures"),
    (1, "VLR-09-L1-01", "Define QbD core principles"),
    (1, "VLR-09-L1-02", "Describe TPQP and design space concepts"),
    (2, "VLR-09-L2-01", "Evaluate QbD implementation in submissions"),
    (2, "VLR-09-L2-02", "Assess PAT applications in manufacturing"),
    (3, "VLR-09-L3-01", "Apply QbD principles to lot release assessment"),
    (3, "VLR-09-L3-02", "Design lifecycle management approaches"),
    (1, "VLR-10-L1-01", "Identify major regulatory frameworks (WHO, ICH, PIC/S)"),
    (1, "VLR-10-L1-02", "Describe AMQF and regional harmonization initiatives"),
    (2, "VLR-10-L2-01", "Compare requirements across jurisdictions"),
    (2, "VLR-10-L2-02", "Apply reliance pathways appropriately"),
    (3, "VLR-10-L3-01", "Navigate complex multi-jurisdiction scenarios"),
    (3, "VLR-10-L3-02", "Contribute to harmonization initiatives"),
];

/// `VLR-05-L2-01` belongs to area `VLR-05`.
pub fn item_area_code(item_code: &str) -> &str {
    item_code.get(..6).unwrap_or(item_code)
}

/// Trailing sequence number of an item code.
pub fn item_sort_order(item_code: &str) -> i32 {
    item_code
        .rsplit('-')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

pub const INSTRUMENT_CODE: &str = "vlr-combined-v1";
pub const INSTRUMENT_NAME: &str = "VLR Competency Assessment v1.0";

/// Self-rating questions per area, taken from the area's first items.
pub const SELF_RATINGS_PER_AREA: usize = 2;

pub const SELF_RATING_SCALE: &[(i32, &str)] = &[
    (1, "No knowledge"),
    (2, "Basic awareness"),
    (3, "Can apply with guidance"),
    (4, "Can apply independently"),
    (5, "Can teach others"),
];

pub struct KnowledgeSeed {
    pub item_code: &'static str,
    pub text: &'static str,
    pub options: [&'static str; 4],
    pub answer: &'static str,
    pub points: i32,
    pub difficulty: i32,
    pub rationale: &'static str,
}

pub const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

pub const KNOWLEDGE_QUESTIONS: &[KnowledgeSeed] = &[
    KnowledgeSeed {
        item_code: "VLR-05-L1-01",
        text: "Which of the following is classified as a Tier 1 Critical Quality Attribute that should NEVER be abbreviated during lot release assessment?",
        options: ["Appearance", "Osmolality", "Sterility", "Extended stability data"],
        answer: "C",
        points: 1,
        difficulty: 1,
        rationale: "Sterility is a Tier 1 CQA directly impacting patient safety and must always be verified regardless of timeline pressures.",
    },
    KnowledgeSeed {
        item_code: "VLR-05-L2-01",
        text: "A vaccine lot shows a potency result of 4.8 log TCID50/dose against a specification of ≥5.0 log TCID50/dose. The manufacturer's investigation indicates the assay was performed correctly and the result is valid. What is the appropriate regulatory action?",
        options: [
            "Approve the lot as the result is close to specification",
            "Reject the lot as it fails to meet the potency specification",
            "Request additional testing with a different method",
            "Approve with condition of enhanced stability monitoring",
        ],
        answer: "B",
        points: 2,
        difficulty: 2,
        rationale: "A confirmed OOS result for a Tier 1 CQA (potency) requires rejection regardless of proximity to specification.",
    },
    KnowledgeSeed {
        item_code: "VLR-07-L3-01",
        text: "You are reviewing an LSP for an mRNA COVID-19 vaccine lot. The manufacturing summary shows a temperature excursion during lipid nanoparticle formulation (4 hours at 28°C instead of the specified 15-25°C range). The manufacturer has provided an impact assessment stating that accelerated stability data shows no significant degradation. All CQA results meet specification. How would you approach this lot release decision?",
        options: [
            "Approve - all CQAs meet specification and stability data supports no impact",
            "Reject - any process deviation requires automatic rejection",
            "Request additional information on specific LNP stability data and conduct enhanced review",
            "Conditionally approve with requirement for enhanced post-release stability monitoring",
        ],
        answer: "C",
        points: 3,
        difficulty: 3,
        rationale: "Expert-level assessment requires balancing multiple factors. While CQAs meet specification, a significant CPP deviation for a relatively new technology warrants enhanced scrutiny.",
    },
    KnowledgeSeed {
        item_code: "VLR-01-L1-01",
        text: "Which vaccine platform uses weakened but live pathogens that can still replicate?",
        options: ["Inactivated vaccines", "Live attenuated vaccines", "Subunit vaccines", "Conjugate vaccines"],
        answer: "B",
        points: 1,
        difficulty: 1,
        rationale: "Live attenuated vaccines contain weakened forms of the pathogen that can replicate but typically do not cause disease in healthy individuals.",
    },
    KnowledgeSeed {
        item_code: "VLR-02-L1-02",
        text: "Which of the following is NOT typically a critical upstream process parameter in cell culture?",
        options: ["Temperature", "Dissolved oxygen", "Container closure integrity", "pH"],
        answer: "C",
        points: 1,
        difficulty: 1,
        rationale: "Container closure integrity is a fill-finish parameter, not an upstream cell culture parameter.",
    },
    KnowledgeSeed {
        item_code: "VLR-03-L2-01",
        text: "A chromatography column shows a 15% reduction in dynamic binding capacity compared to the qualified range. What is the most appropriate initial action?",
        options: [
            "Continue processing as the reduction is within acceptable limits",
            "Immediately replace the column",
            "Investigate root cause and assess impact on product quality",
            "Extend processing time to compensate",
        ],
        answer: "C",
        points: 2,
        difficulty: 2,
        rationale: "A reduction in binding capacity requires investigation to understand the cause and potential impact before deciding on corrective action.",
    },
    KnowledgeSeed {
        item_code: "VLR-04-L2-01",
        text: "Environmental monitoring during fill-finish shows elevated particle counts in a Grade A zone. What should be the immediate action?",
        options: [
            "Continue operations and document the excursion",
            "Stop filling operations and investigate",
            "Increase air changes per hour and continue",
            "Reduce personnel in the area",
        ],
        answer: "B",
        points: 2,
        difficulty: 2,
        rationale: "Elevated particles in Grade A zones represent a potential contamination risk and require immediate cessation of activities.",
    },
    KnowledgeSeed {
        item_code: "VLR-06-L2-02",
        text: "A process deviation occurred where the hold time between purification steps exceeded the validated maximum by 2 hours. Which information is MOST critical for the impact assessment?",
        options: [
            "Historical data on extended hold times",
            "Product stability data at the hold conditions",
            "Number of previous similar deviations",
            "Operator training records",
        ],
        answer: "B",
        points: 2,
        difficulty: 2,
        rationale: "Product stability data at the actual hold conditions directly informs whether product quality was maintained.",
    },
    KnowledgeSeed {
        item_code: "VLR-08-L2-01",
        text: "Under what circumstances might conditional lot release be appropriate?",
        options: [
            "When any CQA fails specification",
            "During a public health emergency with benefit-risk justification",
            "When manufacturing documentation is incomplete",
            "When stability data is pending",
        ],
        answer: "B",
        points: 2,
        difficulty: 2,
        rationale: "Conditional release may be considered in public health emergencies when the benefit-risk assessment supports it and critical safety tests pass.",
    },
    KnowledgeSeed {
        item_code: "VLR-09-L1-01",
        text: "What is the Target Product Quality Profile (TPQP) in Quality by Design?",
        options: [
            "The manufacturing process specifications",
            "A prospective summary of quality characteristics for the product",
            "The final release testing protocol",
            "The stability testing requirements",
        ],
        answer: "B",
        points: 1,
        difficulty: 1,
        rationale: "TPQP is a prospective summary of the quality characteristics of a drug product that ideally will be achieved.",
    },
    KnowledgeSeed {
        item_code: "VLR-10-L2-02",
        text: "When using a WHO prequalification decision as a basis for national registration, this is an example of:",
        options: ["Mutual recognition", "Reliance pathway", "Harmonization", "Regulatory convergence"],
        answer: "B",
        points: 2,
        difficulty: 2,
        rationale: "Reliance refers to taking into account and giving significant weight to assessments by other regulatory authorities or trusted organizations.",
    },
];

pub struct UnitSeed {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub hours: i32,
    pub methods: &'static [&'static str],
    pub outcomes: &'static [&'static str],
    pub level: i32,
    pub areas: &'static [&'static str],
}

pub const LEARNING_UNITS: &[UnitSeed] = &[
    UnitSeed {
        code: "LU-VLR-01",
        name: "Vaccine Platform Technologies Overview",
        description: "Comprehensive introduction to vaccine platform types and their manufacturing characteristics",
        hours: 4,
        methods: &["LECTURE", "CASE_STUDY"],
        outcomes: &[
            "Classify vaccines by platform type",
            "Describe manufacturing approach for each platform",
            "Identify platform-specific quality considerations",
        ],
        level: 1,
        areas: &["VLR-01"],
    },
    UnitSeed {
        code: "LU-VLR-02",
        name: "mRNA and Viral Vector Vaccines",
        description: "Advanced module on emerging vaccine technologies and their regulatory considerations",
        hours: 6,
        methods: &["LECTURE", "CASE_STUDY", "WORKSHOP"],
        outcomes: &[
            "Explain mRNA vaccine mechanism and manufacturing",
            "Describe viral vector vaccine platforms",
            "Identify unique regulatory challenges for novel platforms",
        ],
        level: 2,
        areas: &["VLR-01"],
    },
    UnitSeed {
        code: "LU-VLR-03",
        name: "Upstream Processing Principles",
        description: "Fundamentals of cell culture and fermentation in vaccine manufacturing",
        hours: 6,
        methods: &["LECTURE", "PRACTICAL", "WORKSHOP"],
        outcomes: &[
            "Explain cell culture and fermentation fundamentals",
            "Identify critical upstream parameters",
            "Interpret basic bioreactor data",
        ],
        level: 1,
        areas: &["VLR-02"],
    },
    UnitSeed {
        code: "LU-VLR-04",
        name: "Advanced Upstream Assessment",
        description: "Critical evaluation of upstream manufacturing data for regulatory review",
        hours: 8,
        methods: &["LECTURE", "CASE_STUDY", "WORKSHOP"],
        outcomes: &[
            "Analyze complex bioreactor trending data",
            "Evaluate cell line qualification packages",
            "Assess upstream deviation impact",
        ],
        level: 2,
        areas: &["VLR-02"],
    },
    UnitSeed {
        code: "LU-VLR-05",
        name: "Downstream Processing Fundamentals",
        description: "Introduction to purification and clarification processes",
        hours: 6,
        methods: &["LECTURE", "PRACTICAL"],
        outcomes: &[
            "Describe common purification methods",
            "Identify critical downstream parameters",
            "Understand viral clearance principles",
        ],
        level: 1,
        areas: &["VLR-03"],
    },
    UnitSeed {
        code: "LU-VLR-06",
        name: "Viral Clearance Assessment",
        description: "Evaluation of viral safety and clearance validation",
        hours: 8,
        methods: &["LECTURE", "CASE_STUDY", "WORKSHOP"],
        outcomes: &[
            "Evaluate viral clearance study design",
            "Interpret clearance factor calculations",
            "Assess adequacy of viral safety package",
        ],
        level: 2,
        areas: &["VLR-03"],
    },
    UnitSeed {
        code: "LU-VLR-07",
        name: "Aseptic Processing and Fill-Finish",
        description: "Fundamentals of aseptic manufacturing and contamination control",
        hours: 8,
        methods: &["LECTURE", "PRACTICAL", "WORKSHOP"],
        outcomes: &[
            "Describe aseptic processing requirements",
            "Evaluate environmental monitoring data",
            "Understand container closure integrity testing",
        ],
        level: 1,
        areas: &["VLR-04"],
    },
    UnitSeed {
        code: "LU-VLR-08",
        name: "CQA Fundamentals",
        description: "Understanding critical quality attributes and their assessment",
        hours: 6,
        methods: &["LECTURE", "CASE_STUDY"],
        outcomes: &[
            "Define and categorize CQAs by tier",
            "Identify Tier 1 safety-critical attributes",
            "Interpret basic CQA test results",
        ],
        level: 1,
        areas: &["VLR-05"],
    },
    UnitSeed {
        code: "LU-VLR-09",
        name: "CQA Assessment and OOS Investigation",
        description: "Advanced evaluation of CQAs and out-of-specification results",
        hours: 8,
        methods: &["LECTURE", "CASE_STUDY", "WORKSHOP"],
        outcomes: &[
            "Apply CQA tier classification in decisions",
            "Evaluate OOS investigation reports",
            "Determine regulatory responses to OOS",
        ],
        level: 2,
        areas: &["VLR-05", "VLR-08"],
    },
    UnitSeed {
        code: "LU-VLR-10",
        name: "CPP Monitoring and Deviation Management",
        description: "Critical process parameters and their control",
        hours: 6,
        methods: &["LECTURE", "CASE_STUDY", "WORKSHOP"],
        outcomes: &[
            "Define CPPs and their CQA relationships",
            "Analyze CPP trending data",
            "Evaluate process deviation impact",
        ],
        level: 2,
        areas: &["VLR-06"],
    },
    UnitSeed {
        code: "LU-VLR-11",
        name: "LSP Review Fundamentals",
        description: "Introduction to Lot Summary Protocol review per WHO guidelines",
        hours: 6,
        methods: &["LECTURE", "CASE_STUDY"],
        outcomes: &[
            "Navigate LSP structure (WHO TRS 978 Annex 2)",
            "Identify key documentation components",
            "Review manufacturing summary data",
        ],
        level: 1,
        areas: &["VLR-07"],
    },
    UnitSeed {
        code: "LU-VLR-12",
        name: "LSP Review and Lot Release Decision Making",
        description: "Advanced LSP review and regulatory decision frameworks",
        hours: 12,
        methods: &["LECTURE", "CASE_STUDY", "PRACTICAL", "PEER_REVIEW"],
        outcomes: &[
            "Integrate manufacturing, QC, and deviation data",
            "Apply risk-based decision frameworks",
            "Document and justify regulatory decisions",
        ],
        level: 2,
        areas: &["VLR-07", "VLR-08"],
    },
    UnitSeed {
        code: "LU-VLR-13",
        name: "QbD Principles for Assessors",
        description: "Quality by Design concepts for regulatory assessment",
        hours: 6,
        methods: &["LECTURE", "CASE_STUDY"],
        outcomes: &[
            "Define QbD core principles",
            "Understand design space concepts",
            "Evaluate QbD elements in submissions",
        ],
        level: 1,
        areas: &["VLR-09"],
    },
    UnitSeed {
        code: "LU-VLR-14",
        name: "International Regulatory Frameworks",
        description: "Overview of global regulatory harmonization and reliance",
        hours: 4,
        methods: &["LECTURE", "CASE_STUDY"],
        outcomes: &[
            "Identify major regulatory frameworks",
            "Understand regional harmonization initiatives",
            "Apply reliance pathways",
        ],
        level: 1,
        areas: &["VLR-10"],
    },
    UnitSeed {
        code: "LU-VLR-15",
        name: "Practical LSP Review Workshop",
        description: "Hands-on workshop reviewing real LSP documents",
        hours: 16,
        methods: &["WORKSHOP", "PRACTICAL", "PEER_REVIEW"],
        outcomes: &[
            "Complete full LSP review independently",
            "Identify compliance issues and quality concerns",
            "Make justified lot release recommendations",
        ],
        level: 3,
        areas: &["VLR-07", "VLR-08", "VLR-05"],
    },
];

/// Target level per area for each role, in area order VLR-01..VLR-10.
pub const ROLE_TARGETS: &[(&str, [i32; 10])] = &[
    ("JUNIOR_INSPECTOR", [1, 1, 1, 1, 1, 1, 1, 1, 1, 1]),
    ("INSPECTOR", [2, 2, 2, 2, 2, 2, 2, 2, 1, 2]),
    ("SENIOR_INSPECTOR", [2, 2, 2, 2, 3, 2, 3, 3, 2, 2]),
    ("UNIT_MANAGER", [2, 2, 2, 2, 3, 2, 3, 3, 3, 3]),
];

/// `(name, type, country)`
pub const ORGANIZATIONS: &[(&str, &str, &str)] = &[
    ("EMKEI Innovations", "DEVELOPMENT_PARTNER", "Kenya"),
    ("SAHPRA (Demo)", "NRA", "South Africa"),
];

pub struct UserSeed {
    pub email: &'static str,
    pub password: &'static str,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub role: &'static str,
    pub organization: &'static str,
}

pub const USERS: &[UserSeed] = &[
    UserSeed {
        email: "admin@emkei.co.ke",
        password: "Admin123!",
        first_name: "System",
        last_name: "Administrator",
        role: "SYSTEM_ADMIN",
        organization: "EMKEI Innovations",
    },
    UserSeed {
        email: "facilitator@emkei.co.ke",
        password: "Facilitator123!",
        first_name: "Demo",
        last_name: "Facilitator",
        role: "FACILITATOR",
        organization: "EMKEI Innovations",
    },
    UserSeed {
        email: "participant@sahpra.org.za",
        password: "Participant123!",
        first_name: "Demo",
        last_name: "Participant",
        role: "PARTICIPANT",
        organization: "SAHPRA (Demo)",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::curriculum::DeliveryMethod;
    use crate::models::organization::OrganizationType;
    use crate::models::user::{RoleType, UserRole};

    #[test]
    fn test_every_area_has_six_items() {
        assert_eq!(ITEMS.len(), 60);
        for (code, _, _) in AREAS {
            let n = ITEMS.iter().filter(|(_, item, _)| item_area_code(item) == *code).count();
            assert_eq!(n, 6, "{code}");
        }
    }

    #[test]
    fn test_item_code_helpers() {
        assert_eq!(item_area_code("VLR-05-L2-01"), "VLR-05");
        assert_eq!(item_sort_order("VLR-05-L2-02"), 2);
    }

    #[test]
    fn test_knowledge_questions_reference_known_items() {
        assert_eq!(KNOWLEDGE_QUESTIONS.len(), 11);
        for q in KNOWLEDGE_QUESTIONS {
            assert!(ITEMS.iter().any(|(_, code, _)| *code == q.item_code), "{}", q.item_code);
            assert!(OPTION_LABELS.contains(&q.answer));
        }
    }

    #[test]
    fn test_learning_units_use_known_vocabulary() {
        assert_eq!(LEARNING_UNITS.len(), 15);
        for unit in LEARNING_UNITS {
            for method in unit.methods {
                assert!(method.parse::<DeliveryMethod>().is_ok(), "{method}");
            }
            for area in unit.areas {
                assert!(AREAS.iter().any(|(code, _, _)| code == area), "{area}");
            }
            assert!(LEVELS.iter().any(|l| l.number == unit.level));
        }
    }

    #[test]
    fn test_roles_and_accounts_parse() {
        for (role, targets) in ROLE_TARGETS {
            assert!(role.parse::<RoleType>().is_ok());
            assert!(targets.iter().all(|n| LEVELS.iter().any(|l| l.number == *n)));
        }
        for (_, kind, _) in ORGANIZATIONS {
            assert!(kind.parse::<OrganizationType>().is_ok());
        }
        for user in USERS {
            assert!(user.role.parse::<UserRole>().is_ok());
            assert!(ORGANIZATIONS.iter().any(|(name, _, _)| *name == user.organization));
        }
    }
}
