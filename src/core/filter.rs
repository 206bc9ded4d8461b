use crate::core::StreamRule;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Server-side filter: all terms plus a language constraint, registered as one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFilter {
    terms: Vec<String>,
    language: String,
}

impl StreamFilter {
    /// 沒有任何有效關鍵字時回傳 `None`，代表使用 sample 串流
    pub fn from_terms<I, T>(terms: I, language: &str) -> Option<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if terms.is_empty() {
            return None;
        }

        Some(Self {
            terms,
            language: language.to_string(),
        })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Rule value, e.g. `rust systems lang:en`.
    pub fn query(&self) -> String {
        format!("{} lang:{}", self.terms.join(" "), self.language)
    }

    pub fn to_rule(&self) -> StreamRule {
        StreamRule::new(self.query())
    }
}
