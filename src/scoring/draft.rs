use serde_json::{Map, Value};

use crate::core::models::{InterviewReadiness, Priority, Recommendation, Section};

/// 模型返回的评分草稿：每个字段单独解析，缺失或类型不对的字段为 None，
/// 合并时再由默认值补齐
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreDraft {
    pub overall_score: Option<u8>,
    pub subscores: SubscoreDraft,
    pub summary: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
    pub recommendations: Option<Vec<Recommendation>>,
    pub interview_readiness: Option<InterviewReadiness>,
    pub standout_feature: Option<String>,
    /// 与送评的案例一一对应（按顺序）
    pub case_studies: Vec<CaseStudyDraft>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscoreDraft {
    pub ux_thinking: Option<u8>,
    pub clarity: Option<u8>,
    pub storytelling: Option<u8>,
    pub professionalism: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseStudyDraft {
    pub score: Option<u8>,
    pub subscores: SubscoreDraft,
    pub summary: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub recommendations: Option<Vec<Recommendation>>,
    pub sections: Option<Vec<Section>>,
}

impl ScoreDraft {
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let case_studies = field(obj, &["caseStudies", "case_studies"])
            .and_then(Value::as_array)
            .map(|items| items.iter().map(CaseStudyDraft::from_value).collect())
            .unwrap_or_default();

        Self {
            overall_score: field(obj, &["overallScore", "overall_score", "score"]).and_then(score_value),
            subscores: field(obj, &["subscores"])
                .map(SubscoreDraft::from_value)
                .unwrap_or_default(),
            summary: field(obj, &["summary"]).and_then(text_value),
            strengths: field(obj, &["strengths"]).and_then(string_list),
            weaknesses: field(obj, &["weaknesses"]).and_then(string_list),
            recommendations: field(obj, &["recommendations"]).and_then(recommendation_list),
            interview_readiness: field(obj, &["interviewReadiness", "interview_readiness"])
                .and_then(Value::as_str)
                .and_then(InterviewReadiness::parse),
            standout_feature: field(obj, &["standoutFeature", "standout_feature"]).and_then(text_value),
            case_studies,
        }
    }

    /// 没有任何可用字段时等同于评分失败
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl SubscoreDraft {
    fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self {
            ux_thinking: field(obj, &["uxThinking", "ux_thinking"]).and_then(score_value),
            clarity: field(obj, &["clarity"]).and_then(score_value),
            storytelling: field(obj, &["storytelling"]).and_then(score_value),
            professionalism: field(obj, &["professionalism"]).and_then(score_value),
        }
    }
}

impl CaseStudyDraft {
    fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self {
            score: field(obj, &["score", "overallScore"]).and_then(score_value),
            subscores: field(obj, &["subscores"])
                .map(SubscoreDraft::from_value)
                .unwrap_or_default(),
            summary: field(obj, &["summary"]).and_then(text_value),
            strengths: field(obj, &["strengths"]).and_then(string_list),
            recommendations: field(obj, &["recommendations"]).and_then(recommendation_list),
            sections: field(obj, &["sections"]).and_then(section_list),
        }
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name)).filter(|v| !v.is_null())
}

/// 数字分数，超出范围的截断到 [0, 100]
pub fn score_value(value: &Value) -> Option<u8> {
    let n = value.as_f64()?;
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(0.0, 100.0) as u8)
}

fn text_value(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// 字符串数组；非字符串元素被丢弃，空数组视为缺失
fn string_list(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = value.as_array()?.iter().filter_map(text_value).collect();
    (!items.is_empty()).then_some(items)
}

fn recommendation_list(value: &Value) -> Option<Vec<Recommendation>> {
    let items: Vec<Recommendation> = value
        .as_array()?
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let text = field(obj, &["text", "recommendation"]).and_then(text_value)?;
            let priority = field(obj, &["priority"])
                .and_then(Value::as_str)
                .and_then(Priority::parse)
                .unwrap_or(Priority::Medium);
            let category = field(obj, &["category"])
                .and_then(text_value)
                .unwrap_or_else(|| "General".to_string());
            Some(Recommendation {
                priority,
                category,
                text,
            })
        })
        .collect();
    (!items.is_empty()).then_some(items)
}

fn section_list(value: &Value) -> Option<Vec<Section>> {
    let items: Vec<Section> = value
        .as_array()?
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let name = field(obj, &["name"]).and_then(text_value)?;
            Some(Section {
                kind: field(obj, &["type", "kind"])
                    .and_then(text_value)
                    .unwrap_or_else(|| "other".to_string()),
                name,
                ai_review: field(obj, &["aiReview", "ai_review", "review"])
                    .and_then(text_value)
                    .unwrap_or_default(),
                score: field(obj, &["score"]).and_then(score_value).unwrap_or(0),
                suggestions: field(obj, &["suggestions"])
                    .and_then(string_list)
                    .unwrap_or_default(),
            })
        })
        .collect();
    (!items.is_empty()).then_some(items)
}
