use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyFlagKind {
    MedicalAdvice,
    Emergency,
    Inappropriate,
    DiagnosisRequest,
    PrescriptionRequest,
    TreatmentRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Strictly ordered by max flag severity: `{≥0.9 critical, ≥0.7 high, ≥0.4 medium, else low}`.
    pub fn from_max_severity(max_severity: f32) -> Self {
        if max_severity >= 0.9 {
            RiskLevel::Critical
        } else if max_severity >= 0.7 {
            RiskLevel::High
        } else if max_severity >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyFlag {
    pub kind: SafetyFlagKind,
    pub severity: f32,
    pub description: String,
    pub mitigation: String,
}

/// Aggregation of flags into an overall risk posture, produced by C5 and
/// consumed by C7. `allow_response = false` implies `risk_level == Critical`
/// or the max flag severity is `>= 0.9`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub flags: Vec<SafetyFlag>,
    pub risk_level: RiskLevel,
    pub allow_response: bool,
    pub required_disclaimers: Vec<String>,
}

impl SafetyAssessment {
    /// The permissive default a classifier failure degrades to (§4.4 contract).
    pub fn permissive() -> Self {
        Self {
            flags: Vec::new(),
            risk_level: RiskLevel::Low,
            allow_response: true,
            required_disclaimers: Vec::new(),
        }
    }

    pub fn max_severity(&self) -> f32 {
        self.flags
            .iter()
            .map(|f| f.severity)
            .fold(0.0_f32, f32::max)
    }
}
