use common::types::{RiskLevel, SafetyAssessment, SafetyFlag, SafetyFlagKind};

const EMERGENCY_KEYWORDS: &[&str] = &[
    "suicide",
    "kill myself",
    "harm myself",
    "emergency",
    "call 911",
    "unconscious",
    "bleeding",
    "heart failure",
    "heart attack",
    "stroke",
];

const PREGNANCY_KEYWORDS: &[&str] = &[
    "pregnant",
    "pregnancy",
    "trimester",
    "prenatal",
    "expecting baby",
    "baby bump",
    "morning sickness",
];

const MEDICAL_CONDITION_KEYWORDS: &[&str] = &[
    "hernia",
    "glaucoma",
    "high blood pressure",
    "hypertension",
    "surgery",
    "operation",
    "fracture",
    "arthritis",
    "sciatica",
    "slip disc",
    "slipped disc",
    "spinal injury",
    "cardiac",
    "cancer",
    "tumor",
];

const EMERGENCY_DISCLAIMER: &str =
    "Please call emergency services immediately if this is a medical emergency.";
const CONSULT_DOCTOR_DISCLAIMER: &str =
    "Please consult a doctor or certified yoga therapist before attempting these practices.";
const PRACTICE_CAUTION_DISCLAIMER: &str = "Practice with caution and listen to your body.";
const PRENATAL_GUIDANCE_DISCLAIMER: &str = "Prenatal yoga should be practiced under expert guidance.";

/// Keyword-matched risk assessment of a raw query, run before retrieval.
/// An emergency match short-circuits with a critical, non-permissive
/// assessment; every other path accumulates flags and derives the overall
/// risk level from their maximum severity.
pub fn classify(query: &str) -> SafetyAssessment {
    let query_lower = query.to_lowercase();

    if EMERGENCY_KEYWORDS.iter().any(|kw| query_lower.contains(kw)) {
        tracing::warn!("emergency keywords detected in query, blocking response");
        return SafetyAssessment {
            flags: vec![SafetyFlag {
                kind: SafetyFlagKind::Emergency,
                severity: 1.0,
                description: "Emergency keywords detected".to_string(),
                mitigation: "Direct to emergency services immediately.".to_string(),
            }],
            risk_level: RiskLevel::Critical,
            allow_response: false,
            required_disclaimers: vec![EMERGENCY_DISCLAIMER.to_string()],
        };
    }

    let mut flags = Vec::new();

    if PREGNANCY_KEYWORDS.iter().any(|kw| query_lower.contains(kw)) {
        flags.push(SafetyFlag {
            kind: SafetyFlagKind::MedicalAdvice,
            severity: 0.8,
            description: "Pregnancy-related terms detected".to_string(),
            mitigation: "Provide generic safe info only, warn to consult doctor.".to_string(),
        });
    }

    if let Some(condition) = MEDICAL_CONDITION_KEYWORDS
        .iter()
        .find(|kw| query_lower.contains(*kw))
    {
        flags.push(SafetyFlag {
            kind: SafetyFlagKind::MedicalAdvice,
            severity: 0.7,
            description: format!("Medical condition detected: {condition}"),
            mitigation: "Warn to consult doctor/therapist. Do not prescribe.".to_string(),
        });
    }

    let max_severity = flags.iter().map(|f| f.severity).fold(0.0_f32, f32::max);
    let risk_level = RiskLevel::from_max_severity(max_severity);
    let allow_response = !matches!(risk_level, RiskLevel::Critical);

    let mut disclaimers = Vec::new();
    if matches!(risk_level, RiskLevel::High) {
        disclaimers.push(CONSULT_DOCTOR_DISCLAIMER.to_string());
    } else if matches!(risk_level, RiskLevel::Medium) {
        disclaimers.push(PRACTICE_CAUTION_DISCLAIMER.to_string());
    }
    if flags.iter().any(|f| f.description.starts_with("Pregnancy")) {
        disclaimers.push(PRENATAL_GUIDANCE_DISCLAIMER.to_string());
    }

    SafetyAssessment {
        flags,
        risk_level,
        allow_response,
        required_disclaimers: disclaimers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_keyword_produces_critical_blocked_assessment() {
        let assessment = classify("I am having a heart attack right now");
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert!(!assessment.allow_response);
        assert_eq!(assessment.flags.len(), 1);
    }

    #[test]
    fn pregnancy_terms_yield_high_risk_with_prenatal_disclaimer() {
        let assessment = classify("I am in my third trimester, can I do yoga?");
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert!(assessment.allow_response);
        assert!(assessment
            .required_disclaimers
            .iter()
            .any(|d| d.contains("Prenatal")));
    }

    #[test]
    fn medical_condition_alone_yields_high_risk() {
        let assessment = classify("I have sciatica, what poses help?");
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.flags.len(), 1);
    }

    #[test]
    fn only_the_first_matching_medical_condition_is_flagged() {
        let assessment = classify("I have arthritis and also a fracture");
        let medical_flags = assessment
            .flags
            .iter()
            .filter(|f| f.kind == SafetyFlagKind::MedicalAdvice)
            .count();
        assert_eq!(medical_flags, 1);
    }

    #[test]
    fn benign_query_is_low_risk_with_no_disclaimers() {
        let assessment = classify("What is a good beginner sun salutation sequence?");
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert!(assessment.allow_response);
        assert!(assessment.required_disclaimers.is_empty());
    }
}
