//! Service catalogue: what each care plan includes and who delivers it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Plan name and its sub-services. Standard plans list `All` first.
pub const SERVICES_MASTER: [(&str, &[&str]); 7] = [
    (
        "Plan A: Patient Attendant Care",
        &[
            "All",
            "Basic Care",
            "Assistance with Activities for Daily Living",
            "Feeding & Oral Hygiene",
            "Mobility Support & Transfers",
            "Bed Bath and Emptying Bedpans",
            "Catheter & Ostomy Care",
        ],
    ),
    (
        "Plan B: Skilled Nursing",
        &[
            "All",
            "Intravenous (IV) Therapy & Injections",
            "Medication Management",
            "Advanced Wound Care",
            "Catheter & Ostomy Care",
            "Post-Surgical Care",
        ],
    ),
    (
        "Plan C: Chronic Management",
        &[
            "All",
            "Care for Bed-Ridden Patients",
            "Dementia & Alzheimer's Care",
            "Disability Support",
        ],
    ),
    (
        "Plan D: Elderly Companion",
        &[
            "All",
            "Companionship & Conversation",
            "Fall Prevention & Mobility",
            "Light Meal Preparation",
        ],
    ),
    (
        "Plan E: Maternal & Newborn",
        &["All", "Postnatal & Maternal Care", "Newborn Care Assistance"],
    ),
    (
        "Plan F: Rehabilitative Care",
        &[
            "Therapeutic Massage",
            "Exercise Therapy",
            "Geriatric Rehabilitation",
            "Neuro Rehabilitation",
            "Pain Management",
            "Post Op Rehab",
        ],
    ),
    (
        "A-la-carte Services",
        &[
            "Hospital Visits",
            "Medical Equipment",
            "Medicines",
            "Diagnostic Services",
            "Nutrition Consultation",
            "Ambulance",
            "Doctor Visits",
            "X-Ray",
            "Blood Collection",
        ],
    ),
];

/// Plans A-E: bundles whose "All" expands and whose siblings are listed as not included.
const STANDARD_PLAN_COUNT: usize = 5;

fn lookup(plan: &str) -> Option<(&'static str, &'static [&'static str])> {
    SERVICES_MASTER
        .iter()
        .find(|(name, _)| *name == plan)
        .or_else(|| SERVICES_MASTER.iter().find(|(name, _)| plan.contains(name)))
        .copied()
}

fn is_standard(plan: &str) -> bool {
    SERVICES_MASTER[..STANDARD_PLAN_COUNT]
        .iter()
        .any(|(name, _)| *name == plan)
}

/// Short name printed on documents.
pub fn display_name(plan: &str) -> String {
    let name = match lookup(plan).map(|(name, _)| name) {
        Some("Plan A: Patient Attendant Care") => "Patient Care",
        Some("Plan B: Skilled Nursing") => "Nursing Care",
        Some("Plan C: Chronic Management") => "Chronic Management Care",
        Some("Plan D: Elderly Companion") => "Elderly Companion Care",
        Some("Plan E: Maternal & Newborn") => "Maternal & Newborn Care",
        Some("Plan F: Rehabilitative Care") => "Rehabilitative Care",
        Some("A-la-carte Services") => "Other Services",
        _ => plan.trim(),
    };
    name.to_string()
}

/// Services included in and excluded from an engagement, both sorted.
///
/// `sub_service` is the comma-separated intake cell. For a standard plan,
/// `All` expands to the whole plan and every other standard plan's services
/// are listed as not included. For the remaining plans the not-included list
/// is whatever of the plan was not picked.
pub fn base_lists(plan: &str, sub_service: &str) -> (Vec<String>, Vec<String>) {
    let (base_plan, services): (&str, &[&str]) = match lookup(plan) {
        Some((name, services)) => (name, services),
        None => (plan, &[]),
    };
    let standard = is_standard(base_plan);

    let included: BTreeSet<String> = if standard && sub_service.contains("All") {
        services
            .iter()
            .filter(|s| !s.eq_ignore_ascii_case("all"))
            .map(|s| s.trim().to_string())
            .collect()
    } else {
        sub_service
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };

    let not_included: BTreeSet<String> = if standard {
        SERVICES_MASTER[..STANDARD_PLAN_COUNT]
            .iter()
            .filter(|(name, _)| *name != base_plan)
            .flat_map(|(_, items)| items.iter())
            .filter(|s| !s.eq_ignore_ascii_case("all"))
            .map(|s| s.trim().to_string())
            .collect()
    } else {
        services
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && !included.contains(s))
            .collect()
    };

    (included.into_iter().collect(), not_included.into_iter().collect())
}

/// Who delivers the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Nurse,
    Physiotherapist,
    Attendant,
    /// Plan does not pin the role; staff pick one.
    Caregiver,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Nurse => "Nurse",
            Role::Physiotherapist => "Physiotherapist",
            Role::Attendant => "Attendant",
            Role::Caregiver => "Nurse/Caregiver/Attendant",
        }
    }
}

/// Default role for a plan and whether it is locked to that role.
pub fn infer_role(plan: &str) -> (Role, bool) {
    if plan.contains("Plan B") {
        (Role::Nurse, true)
    } else if plan.contains("Plan F") {
        (Role::Physiotherapist, true)
    } else if plan.contains("A-la-carte") {
        (Role::Attendant, true)
    } else {
        (Role::Caregiver, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_expands_for_standard_plans() {
        let (inc, exc) = base_lists("Plan E: Maternal & Newborn", "All");
        assert_eq!(inc, vec!["Newborn Care Assistance", "Postnatal & Maternal Care"]);
        assert!(exc.contains(&"Basic Care".to_string()));
        assert!(exc.contains(&"Post-Surgical Care".to_string()));
        assert!(!exc.iter().any(|s| s == "All"));
        assert!(!exc.contains(&"Newborn Care Assistance".to_string()));
    }

    #[test]
    fn shared_services_are_deduplicated() {
        // Catheter care appears under both plan A and plan B
        let (_, exc) = base_lists("Plan C: Chronic Management", "All");
        assert_eq!(exc.iter().filter(|s| *s == "Catheter & Ostomy Care").count(), 1);
    }

    #[test]
    fn non_standard_plans_exclude_unpicked_items() {
        let (inc, exc) = base_lists("Plan F: Rehabilitative Care", "Exercise Therapy, Pain Management");
        assert_eq!(inc, vec!["Exercise Therapy", "Pain Management"]);
        assert_eq!(exc.len(), 4);
        assert!(!exc.contains(&"Exercise Therapy".to_string()));
    }

    #[test]
    fn decorated_plan_names_resolve() {
        let (inc, _) = base_lists("Plan B: Skilled Nursing (Night)", "All");
        assert_eq!(inc.len(), 5);
        assert_eq!(display_name("Plan B: Skilled Nursing (Night)"), "Nursing Care");
        assert_eq!(display_name("Custom Package"), "Custom Package");
    }

    #[test]
    fn unknown_plan_keeps_picked_items() {
        let (inc, exc) = base_lists("Custom", "Cooking, ,Errands");
        assert_eq!(inc, vec!["Cooking", "Errands"]);
        assert!(exc.is_empty());
    }

    #[test]
    fn roles() {
        assert_eq!(infer_role("Plan B: Skilled Nursing"), (Role::Nurse, true));
        assert_eq!(infer_role("Plan F: Rehabilitative Care"), (Role::Physiotherapist, true));
        assert_eq!(infer_role("A-la-carte Services"), (Role::Attendant, true));
        assert_eq!(infer_role("Plan A: Patient Attendant Care"), (Role::Caregiver, false));
        assert_eq!(infer_role(""), (Role::Caregiver, false));
    }
}
