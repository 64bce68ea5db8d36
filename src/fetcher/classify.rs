use std::collections::HashSet;

use crate::core::models::{CaseStudyCandidate, LinkInfo};

/// 按关键词挑出案例链接：href 与文本拼接后不区分大小写做子串匹配，保持 DOM 顺序
pub fn classify_case_studies(
    links: &[LinkInfo],
    keywords: &[String],
    page_url: &str,
    limit: usize,
) -> Vec<CaseStudyCandidate> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let own_url = page_url.trim_end_matches('/');
    let mut seen = HashSet::new();

    links
        .iter()
        .filter(|link| link.href.trim_end_matches('/') != own_url)
        .filter(|link| {
            let haystack = format!("{} {}", link.href, link.text).to_lowercase();
            keywords.iter().any(|k| haystack.contains(k.as_str()))
        })
        .filter(|link| seen.insert(link.href.clone()))
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(href: &str, text: &str) -> LinkInfo {
        LinkInfo {
            href: href.to_string(),
            text: text.to_string(),
        }
    }

    fn keywords() -> Vec<String> {
        ["case", "work", "project", "portfolio"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_case_study_link_is_selected() {
        let links = vec![link("https://x.com/case-study-1", "View project")];
        let picked = classify_case_studies(&links, &keywords(), "https://x.com/", 3);
        assert_eq!(picked, links);
    }

    #[test]
    fn test_about_link_is_not_selected() {
        let links = vec![link("https://x.com/about", "About us")];
        assert!(classify_case_studies(&links, &keywords(), "https://x.com/", 3).is_empty());
    }

    #[test]
    fn test_matching_is_case_insensitive_on_text() {
        let links = vec![link("https://x.com/p/1", "Selected WORK")];
        assert_eq!(classify_case_studies(&links, &keywords(), "https://x.com/", 3).len(), 1);
    }

    #[test]
    fn test_order_dedupe_and_cap() {
        let links = vec![
            link("https://x.com/projects/a", "A"),
            link("https://x.com/about", "About"),
            link("https://x.com/projects/a", "A again"),
            link("https://x.com/work/b", "B"),
            link("https://x.com/case/c", "C"),
            link("https://x.com/case/d", "D"),
        ];
        let picked = classify_case_studies(&links, &keywords(), "https://x.com/", 3);
        let hrefs: Vec<&str> = picked.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec!["https://x.com/projects/a", "https://x.com/work/b", "https://x.com/case/c"]
        );
    }

    #[test]
    fn test_own_url_is_excluded() {
        let links = vec![link("https://x.com/portfolio/", "Home")];
        let picked = classify_case_studies(&links, &keywords(), "https://x.com/portfolio", 3);
        assert!(picked.is_empty());
    }
}
