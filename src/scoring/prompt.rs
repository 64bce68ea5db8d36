use crate::utils::text::truncate_chars;

/// 送去评分的一个案例
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseStudyBrief {
    pub url: String,
    pub title: String,
    pub text: String,
}

/// 一次评分请求的全部输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringInput {
    pub url: String,
    pub content: String,
    pub case_studies: Vec<CaseStudyBrief>,
}

/// 把输入填进模板的 {url} / {content} / {case_studies}
///
/// 总文本量受 `max_chars` 约束：有案例时首页占一半，其余平分给各案例。
pub fn render_prompt(template: &str, input: &ScoringInput, max_chars: usize) -> String {
    let (homepage_budget, per_case_budget) = if input.case_studies.is_empty() {
        (max_chars, 0)
    } else {
        let half = max_chars / 2;
        (half, (max_chars - half) / input.case_studies.len())
    };

    let case_studies = if input.case_studies.is_empty() {
        "(none found)".to_string()
    } else {
        input
            .case_studies
            .iter()
            .enumerate()
            .map(|(i, cs)| {
                format!(
                    "{}. {} ({})\n{}",
                    i + 1,
                    cs.title,
                    cs.url,
                    truncate_chars(&cs.text, per_case_budget)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    template
        .replace("{url}", &input.url)
        .replace("{content}", &truncate_chars(&input.content, homepage_budget))
        .replace("{case_studies}", &case_studies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(cases: usize) -> ScoringInput {
        ScoringInput {
            url: "https://jane.design/".to_string(),
            content: "a".repeat(100),
            case_studies: (0..cases)
                .map(|i| CaseStudyBrief {
                    url: format!("https://jane.design/work/{}", i),
                    title: format!("Project {}", i),
                    text: "b".repeat(100),
                })
                .collect(),
        }
    }

    #[test]
    fn test_placeholders_are_filled() {
        let prompt = render_prompt("U={url}\nC={content}\nS={case_studies}", &input(1), 1_000);
        assert!(prompt.starts_with("U=https://jane.design/\n"));
        assert!(prompt.contains("1. Project 0 (https://jane.design/work/0)"));
        assert!(!prompt.contains("{content}"));
    }

    #[test]
    fn test_content_is_bounded() {
        let prompt = render_prompt("{content}|{case_studies}", &input(2), 40);
        let (homepage, cases) = prompt.split_once('|').unwrap();
        assert_eq!(homepage.chars().count(), 20);
        assert_eq!(cases.matches('b').count(), 20, "每个案例 10 个字符");
    }

    #[test]
    fn test_no_case_studies() {
        let prompt = render_prompt("{content}|{case_studies}", &input(0), 40);
        assert_eq!(prompt, format!("{}|(none found)", "a".repeat(40)));
    }
}
