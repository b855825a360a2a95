//! Category inference for entities without an explicit type
//!
//! Best-effort heuristic, not a classifier with guarantees. Precedence, first
//! match wins:
//!
//! 1. an explicit label other than the generic wrapper labels
//! 2. a container label marking a source-content unit (episode / chunk)
//! 3. the ordered [`ClassifierRule`] table over the display name
//! 4. `Concept`
//!
//! The result depends only on `(labels, name)`.

use std::sync::OnceLock;

use super::types::Category;

/// Wrapper labels every entity carries; they say nothing about its type
const GENERIC_LABELS: &[&str] = &["entity", "node", "__entity__", "__node__", "base"];

/// Labels marking a unit of ingested source content
const EPISODIC_MARKERS: &[&str] = &[
    "episodic",
    "episode",
    "episodicnode",
    "chunk",
    "textchunk",
    "documentchunk",
    "__episode__",
];

// =============================================================================
// RULE TABLE
// =============================================================================

/// How a rule matches a display name
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Name ends with one of the tokens (trailing punctuation ignored)
    Suffix(Vec<&'static str>),
    /// Name contains one of the keywords
    Keyword(Vec<&'static str>),
    /// Name equals one of the entries
    Exact(Vec<&'static str>),
    /// Short, unembellished personal name
    PersonalName,
}

#[derive(Debug, Clone)]
pub struct ClassifierRule {
    /// Short rule name, used in trace output
    pub name: &'static str,
    pub pattern: NamePattern,
    pub category: Category,
}

impl ClassifierRule {
    pub fn new(name: &'static str, pattern: NamePattern, category: Category) -> Self {
        Self {
            name,
            pattern,
            category,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.pattern {
            NamePattern::Suffix(tokens) => tokens.iter().any(|t| ends_with_token(name, t)),
            NamePattern::Keyword(words) => words.iter().any(|w| contains_keyword(name, w)),
            NamePattern::Exact(entries) => entries.iter().any(|e| name == *e),
            NamePattern::PersonalName => looks_like_personal_name(name),
        }
    }
}

/// Ordered rule table plus the label precedence steps
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    rules: Vec<ClassifierRule>,
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl TypeClassifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }

    pub fn classify(&self, labels: &[String], name: &str) -> Category {
        if let Some(explicit) = explicit_label(labels) {
            return explicit;
        }

        if labels
            .iter()
            .any(|l| EPISODIC_MARKERS.contains(&l.trim().to_lowercase().as_str()))
        {
            return Category::Episodic;
        }

        let name = name.trim();
        if !name.is_empty() {
            if let Some(rule) = self.rules.iter().find(|r| r.matches(name)) {
                tracing::trace!("classify {:?}: rule {} -> {}", name, rule.name, rule.category);
                return rule.category.clone();
            }
        }

        Category::Concept
    }
}

/// Classify with the built-in rule table
pub fn classify(labels: &[String], name: &str) -> Category {
    static DEFAULT: OnceLock<TypeClassifier> = OnceLock::new();
    DEFAULT.get_or_init(TypeClassifier::default).classify(labels, name)
}

fn explicit_label(labels: &[String]) -> Option<Category> {
    labels
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .find(|l| {
            let lower = l.to_lowercase();
            !GENERIC_LABELS.contains(&lower.as_str()) && !EPISODIC_MARKERS.contains(&lower.as_str())
        })
        .map(|l| Category::from(l.to_string()))
}

/// The built-in name rules, in precedence order
pub fn default_rules() -> Vec<ClassifierRule> {
    use NamePattern::*;

    vec![
        ClassifierRule::new(
            "org-suffix",
            Suffix(vec![
                "公司", "集团", "大学", "学院", "学校", "银行", "研究院", "研究所", "医院",
                "协会", "基金会", "委员会", "事务所", "工作室", "实验室", "inc", "ltd",
                "llc", "corp", "corporation", "company", "co", "gmbh", "ag", "plc", "group",
                "university", "college", "institute", "bank", "foundation", "association",
                "labs",
            ]),
            Category::Organization,
        ),
        ClassifierRule::new(
            "place-suffix",
            Suffix(vec![
                "省", "市", "县", "区", "镇", "乡", "村", "州", "国", "街道", "路", "city",
                "province", "county", "state", "district", "town", "village", "street",
            ]),
            Category::Location,
        ),
        ClassifierRule::new(
            "known-person",
            Exact(vec!["张三", "李四", "王五", "赵六", "John Doe", "Jane Doe"]),
            Category::Person,
        ),
        ClassifierRule::new(
            "role-title",
            Keyword(vec![
                "经理", "总监", "工程师", "主任", "总裁", "董事", "主管", "教授", "负责人",
                "专员", "顾问", "ceo", "cto", "cfo", "coo", "manager", "director", "engineer",
                "president", "officer", "professor", "architect", "analyst",
            ]),
            Category::Concept,
        ),
        ClassifierRule::new(
            "product-system",
            Keyword(vec![
                "系统", "平台", "软件", "框架", "数据库", "算法", "模型", "引擎", "接口",
                "服务器", "system", "platform", "software", "framework", "database", "api",
                "sdk", "engine", "server", "algorithm",
            ]),
            Category::Technology,
        ),
        ClassifierRule::new("short-name", PersonalName, Category::Person),
    ]
}

// =============================================================================
// MATCHERS
// =============================================================================

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

/// Suffix match. ASCII tokens must start on a word boundary so `inc` does
/// not match `Zinc`.
fn ends_with_token(name: &str, token: &str) -> bool {
    let trimmed = name.trim_end_matches(|c: char| c == '.' || c == ',' || c.is_whitespace());
    if token.is_ascii() {
        let lower = trimmed.to_ascii_lowercase();
        if !lower.ends_with(token) {
            return false;
        }
        let head = &lower[..lower.len() - token.len()];
        head.chars().last().is_some_and(|c| !c.is_ascii_alphanumeric())
    } else {
        // A lone suffix ("市") is not a place name
        trimmed.ends_with(token) && trimmed.chars().count() > token.chars().count()
    }
}

/// Keyword match: substring for CJK, whole word for ASCII
fn contains_keyword(name: &str, keyword: &str) -> bool {
    if keyword.is_ascii() {
        name.split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word.eq_ignore_ascii_case(keyword))
    } else {
        name.contains(keyword)
    }
}

const COMMON_SURNAMES: &str = "王李张刘陈杨黄赵吴周徐孙马朱胡郭何高林罗郑梁谢宋唐许韩冯邓曹彭曾肖田董袁潘于蒋蔡余杜叶程苏魏吕丁任沈姚卢姜崔钟谭陆汪范金石廖贾夏韦付方白邹孟熊秦邱江尹薛闫段雷侯龙史陶黎贺顾毛郝龚邵万钱严覃武戴莫孔向汤欧司";

/// Two or three CJK characters led by a common surname, or two to three
/// capitalised Latin words with no digits ("Ada Lovelace").
fn looks_like_personal_name(name: &str) -> bool {
    let chars: Vec<char> = name.chars().collect();
    if chars.iter().all(|c| is_cjk(*c)) {
        return (2..=3).contains(&chars.len()) && COMMON_SURNAMES.contains(chars[0]);
    }

    let words: Vec<&str> = name.split_whitespace().collect();
    (2..=3).contains(&words.len())
        && words.iter().all(|w| {
            let mut cs = w.chars();
            let first_upper = cs.next().is_some_and(|c| c.is_ascii_uppercase());
            first_upper
                && w.len() <= 12
                && w.chars().all(|c| c.is_ascii_alphabetic() || c == '-' || c == '\'')
                && w.chars().skip(1).any(|c| c.is_ascii_lowercase())
        })
}

// =============================================================================
// TESTS
// =============================================================================
