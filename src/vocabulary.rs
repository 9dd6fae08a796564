//! Keyword tables used for gating, scoring and tagging.
//!
//! The tables are plain data handed to each stage at construction time. The
//! built-in defaults cover AI/tech news; tests swap in small fixture tables.

use once_cell::sync::Lazy;

static DEFAULT_VOCABULARY: Lazy<Vocabulary> = Lazy::new(|| Vocabulary {
    keywords: to_owned(&[
        "artificial intelligence",
        "ai",
        "machine learning",
        "ml",
        "deep learning",
        "neural network",
        "algorithm",
        "automation",
        "chatgpt",
        "openai",
        "gemini",
        "llm",
        "large language model",
        "natural language processing",
        "nlp",
        "computer vision",
        "robotics",
        "data science",
        "tensorflow",
        "pytorch",
        "generative ai",
        "gpt",
        "transformer",
        "anthropic",
        "claude",
        "midjourney",
        "stable diffusion",
        "tech",
        "technology",
        "startup",
        "silicon valley",
    ]),
    spam_phrases: to_owned(&[
        "click here",
        "buy now",
        "limited time",
        "exclusive offer",
        "advertisement",
        "sponsored content",
        "affiliate",
    ]),
    gate_keywords: to_owned(&[
        "ai",
        "artificial intelligence",
        "machine learning",
        "deep learning",
        "neural",
        "llm",
        "gpt",
        "chatgpt",
        "openai",
        "anthropic",
        "gemini",
        "model",
        "robot",
        "automation",
    ]),
    topics: vec![
        topic("Machine Learning", &["machine learning", "ml", "neural network", "deep learning"]),
        topic("AI Research", &["research", "study", "paper", "arxiv", "academic"]),
        topic("OpenAI", &["openai", "chatgpt", "gpt-4", "gpt-3", "dall-e"]),
        topic("Google AI", &["google", "gemini", "bard", "deepmind", "tensorflow"]),
        topic("Computer Vision", &["computer vision", "image recognition", "opencv", "vision"]),
        topic("NLP", &["natural language processing", "nlp", "language model", "text"]),
        topic("Robotics", &["robot", "robotics", "autonomous", "automation"]),
        topic("Startups", &["startup", "funding", "investment", "venture capital"]),
        topic("Big Tech", &["microsoft", "apple", "amazon", "meta", "facebook"]),
        topic("Ethics", &["ethics", "bias", "fairness", "responsible ai"]),
        topic("Hardware", &["chip", "gpu", "nvidia", "processor", "hardware"]),
        topic("Software", &["software", "platform", "api", "framework", "tool"]),
    ],
});

/// A topic label and the lower-case substrings that trigger it.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicRule {
    pub label: String,
    pub triggers: Vec<String>,
}

/// Immutable keyword configuration.
///
/// All entries are stored lower-case; matching is case-insensitive substring
/// search against lower-cased text.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    /// Relevance keywords. The scorer divides by `keywords.len()`.
    pub keywords: Vec<String>,
    /// Phrases that cost 0.1 each when present.
    pub spam_phrases: Vec<String>,
    /// Title words required by listing sources with a keyword gate.
    pub gate_keywords: Vec<String>,
    /// Topic rules in declaration order.
    pub topics: Vec<TopicRule>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        DEFAULT_VOCABULARY.clone()
    }
}

impl Vocabulary {
    pub fn new(
        keywords: &[&str],
        spam_phrases: &[&str],
        gate_keywords: &[&str],
        topics: &[(&str, &[&str])],
    ) -> Self {
        Self {
            keywords: to_owned(keywords),
            spam_phrases: to_owned(spam_phrases),
            gate_keywords: to_owned(gate_keywords),
            topics: topics
                .iter()
                .map(|(label, triggers)| topic(label, triggers))
                .collect(),
        }
    }

    /// True when `title` contains at least one gate keyword.
    pub fn passes_gate(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.gate_keywords.iter().any(|k| title.contains(k.as_str()))
    }
}

fn topic(label: &str, triggers: &[&str]) -> TopicRule {
    TopicRule {
        label: label.to_string(),
        triggers: to_owned(triggers),
    }
}

fn to_owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}
