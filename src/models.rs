use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum EducationLevel {
    #[serde(rename = "class_10")]
    #[value(name = "class_10")]
    Class10,
    #[serde(rename = "class_12")]
    #[value(name = "class_12")]
    Class12,
}

impl EducationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EducationLevel::Class10 => "class_10",
            EducationLevel::Class12 => "class_12",
        }
    }
}

/// Self-rated attributes sent to `/recommend`.
///
/// Skill scores are 0..=100, stress and risk are 0..=10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentInput {
    pub math: u32,
    pub science: u32,
    pub english: u32,
    pub logical: u32,
    pub creativity: u32,
    pub scientific_interest: u32,
    pub communication: u32,
    pub leadership: u32,
    pub stress_level: u32,
    pub risk_level: u32,
    pub budget: u64,
    pub location: String,
    pub education_level: EducationLevel,
}

impl Default for StudentInput {
    fn default() -> Self {
        Self {
            math: 50,
            science: 50,
            english: 50,
            logical: 50,
            creativity: 50,
            scientific_interest: 50,
            communication: 50,
            leadership: 50,
            stress_level: 5,
            risk_level: 5,
            budget: 500_000,
            location: String::new(),
            education_level: EducationLevel::Class10,
        }
    }
}

impl StudentInput {
    pub fn skill_scores(&self) -> [(&'static str, u32); 8] {
        [
            ("math", self.math),
            ("science", self.science),
            ("english", self.english),
            ("logical", self.logical),
            ("creativity", self.creativity),
            ("scientific_interest", self.scientific_interest),
            ("communication", self.communication),
            ("leadership", self.leadership),
        ]
    }

    pub fn disposition_scores(&self) -> [(&'static str, u32); 2] {
        [
            ("stress_level", self.stress_level),
            ("risk_level", self.risk_level),
        ]
    }
}

/// A validated input frozen at the moment it was sent.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    input: StudentInput,
}

impl Submission {
    pub fn new(input: StudentInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            submitted_at: Utc::now(),
            input,
        }
    }

    pub fn input(&self) -> &StudentInput {
        &self.input
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionIntelligence {
    pub academic_strength: u32,
    pub financial_feasibility: u32,
    pub competition_readiness: u32,
    pub psychological_alignment: u32,
    /// Display order, not severity order.
    pub risk_flags: Vec<String>,
}

impl DecisionIntelligence {
    pub fn sub_scores(&self) -> [(&'static str, u32); 4] {
        [
            ("Academic Strength", self.academic_strength),
            ("Financial Feasibility", self.financial_feasibility),
            ("Competition Readiness", self.competition_readiness),
            ("Psychological Alignment", self.psychological_alignment),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeMatch {
    pub degree: String,
    pub match_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerMatch {
    pub career: String,
    pub match_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionMatch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub match_score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementStep {
    pub action: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ImprovementStep {
    pub fn is_high_priority(&self) -> bool {
        self.priority.eq_ignore_ascii_case("high")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommended_stream: String,
    pub confidence_score: u32,
    #[serde(default)]
    pub decision_intelligence: DecisionIntelligence,
    #[serde(default)]
    pub degree_matches: Vec<DegreeMatch>,
    #[serde(default)]
    pub career_matches: Vec<CareerMatch>,
    #[serde(default)]
    pub institution_matches: Vec<InstitutionMatch>,
    #[serde(default)]
    pub improvement_plan: Vec<ImprovementStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub budget: u64,
    pub stress_level: u32,
    pub risk_level: u32,
}

impl Default for SimulationInput {
    fn default() -> Self {
        Self {
            budget: 500_000,
            stress_level: 5,
            risk_level: 5,
        }
    }
}

impl From<&StudentInput> for SimulationInput {
    fn from(input: &StudentInput) -> Self {
        Self {
            budget: input.budget,
            stress_level: input.stress_level,
            risk_level: input.risk_level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub baseline_score: u32,
    pub scenario_score: u32,
    /// Server-computed; not guaranteed to equal scenario minus baseline.
    pub score_improvement: i64,
}
