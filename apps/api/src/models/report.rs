use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::lenient;

/// Literal marker carried by every stored insight line.
pub const INSIGHT_PREFIX: &str = "INSIGHT: ";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StudentInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::age")]
    pub age: u32,
    #[serde(default, deserialize_with = "lenient::string")]
    pub grade: String,
}

/// One row of a psychometric test table.
///
/// `score` is absent for HIGH5 rows, which carry `domain` instead. Both keep
/// the JSON type the service sent, so a numeric score goes back out as a number.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestRow {
    #[serde(default, deserialize_with = "lenient::string")]
    pub preference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Value>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub meaning: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestRow {
    pub fn score_text(&self) -> Option<String> {
        self.score.as_ref().and_then(lenient::scalar_text)
    }

    pub fn domain_text(&self) -> Option<String> {
        self.domain.as_ref().and_then(lenient::scalar_text)
    }
}

/// Test key → rows, in the order the service returned them.
pub type TestData = IndexMap<String, Vec<TestRow>>;

/// A `null` test table, or a `null` row list under a key, reads as empty.
fn nullable_test_data<'de, D>(deserializer: D) -> Result<TestData, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, Option<Vec<TestRow>>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, rows)| (key, rows.unwrap_or_default()))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_info: Option<StudentInfo>,
    #[serde(default, deserialize_with = "nullable_test_data")]
    pub test_data: TestData,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub insight_lines: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportData {
    pub fn rows(&self, kind: TestKind) -> &[TestRow] {
        self.test_data
            .get(kind.key())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// The four psychometric instruments the workflow extracts, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    #[serde(rename = "test16PersonalityData")]
    Personality16,
    #[serde(rename = "high5Data")]
    High5,
    #[serde(rename = "bigFiveData")]
    BigFive,
    #[serde(rename = "riasecData")]
    Riasec,
}

impl TestKind {
    pub const ALL: [TestKind; 4] = [
        TestKind::Personality16,
        TestKind::High5,
        TestKind::BigFive,
        TestKind::Riasec,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TestKind::Personality16 => "test16PersonalityData",
            TestKind::High5 => "high5Data",
            TestKind::BigFive => "bigFiveData",
            TestKind::Riasec => "riasecData",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Position of this test's insight line in `insightLines`.
    pub fn position(self) -> usize {
        match self {
            TestKind::Personality16 => 0,
            TestKind::High5 => 1,
            TestKind::BigFive => 2,
            TestKind::Riasec => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            TestKind::Personality16 => "MBTI-style Personality Type",
            TestKind::High5 => "HIGH5 Strengths Themes",
            TestKind::BigFive => "Big Five Personality Traits (OCEAN)",
            TestKind::Riasec => "RIASEC Career Interest Themes",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            TestKind::Personality16 => {
                "Categorizes people into 16 personality types based on 5 preferences: how you \
                 gain energy (Introvert/Extravert), how you process information \
                 (Intuitive/Observant), how you make decisions (Thinking/Feeling), how you \
                 approach life (Judging/Prospecting), and how you see yourself \
                 (Assertive/Turbulent)."
            }
            TestKind::High5 => {
                "Identifies your top 5 natural strengths from 20 possible talents (like \
                 Empathizer, Brainstormer, Deliverer). Focuses on what energizes you and where \
                 you have the greatest potential for success."
            }
            TestKind::BigFive => {
                "Measures 5 core personality dimensions: Openness (creativity), \
                 Conscientiousness (organization), Extraversion (sociability), Agreeableness \
                 (cooperation), Neuroticism (emotional stability)."
            }
            TestKind::Riasec => {
                "Assesses career interests across 6 work personality types: Realistic \
                 (hands-on), Investigative (analytical), Artistic (creative), Social (helping \
                 others), Enterprising (leading), Conventional (organized tasks)."
            }
        }
    }

    pub fn headers(self) -> [&'static str; 3] {
        match self {
            TestKind::Personality16 => ["Preference", "Score", "Meaning"],
            TestKind::High5 => ["Strength", "Domain", "Meaning"],
            TestKind::BigFive => ["Trait", "Score", "Meaning"],
            TestKind::Riasec => ["Theme", "Score", "Meaning"],
        }
    }

    /// HIGH5 rows carry a domain instead of a score.
    pub fn has_score(self) -> bool {
        !matches!(self, TestKind::High5)
    }
}

/// Removes a leading insight marker for display or editing.
pub fn strip_insight_prefix(line: &str) -> &str {
    line.strip_prefix(INSIGHT_PREFIX).unwrap_or(line)
}

/// Re-applies the insight marker before storage. Applied unconditionally.
pub fn with_insight_prefix(text: &str) -> String {
    format!("{INSIGHT_PREFIX}{text}")
}
