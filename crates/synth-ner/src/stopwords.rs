//! Function-word lexicon used to suppress low-value terms.

use std::collections::HashSet;
use std::sync::OnceLock;

/// English function words, pronouns, auxiliaries and contraction stems.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "ain", "all", "almost", "also",
    "always", "am", "an", "and", "another", "any", "anybody", "anyone", "anything", "appears",
    "approximately", "are", "aren", "aren't", "as", "at", "be", "because", "been", "before",
    "being", "below", "beside", "besides", "between", "both", "but", "by", "can", "commonly",
    "could", "couldn", "couldn't", "d", "did", "didn", "didn't", "different", "do", "does",
    "doesn", "doesn't", "doing", "don", "don't", "done", "down", "during", "each", "either",
    "every", "everybody", "everyone", "everything", "few", "for", "from", "further", "generally",
    "had", "hadn", "hadn't", "has", "hasn", "hasn't", "have", "haven", "haven't", "having",
    "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "however",
    "i", "if", "in", "into", "is", "isn", "isn't", "it", "it's", "its",
    "itself", "just", "least", "less", "likely", "ll", "m", "ma", "many", "may",
    "me", "might", "mightn", "mightn't", "mine", "more", "most", "mostly", "must", "mustn",
    "mustn't", "my", "myself", "nearly", "needn", "needn't", "neither", "never", "no", "no one",
    "nobody", "nor", "normally", "not", "nothing", "now", "o", "of", "off", "often",
    "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over",
    "own", "perhaps", "possibly", "probably", "rarely", "re", "s", "same", "seems", "several",
    "shall", "shan", "shan't", "she", "she's", "should", "should've", "shouldn", "shouldn't", "so",
    "some", "somebody", "someone", "something", "sometimes", "such", "t", "than", "that", "that'll",
    "the", "their", "theirs", "them", "themselves", "then", "there", "therefore", "these", "they",
    "this", "those", "through", "thus", "to", "too", "under", "unless", "until", "up",
    "usually", "ve", "very", "was", "wasn", "wasn't", "we", "were", "weren", "weren't",
    "what", "whatever", "when", "whenever", "where", "wherever", "whether", "which", "whichever", "while",
    "who", "whoever", "whom", "whomever", "whose", "why", "will", "with", "won", "won't",
    "would", "wouldn", "wouldn't", "y", "yet", "you", "you'd", "you'll", "you're", "you've",
    "your", "yours", "yourself", "yourselves",
];

fn builtin() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Returns true if `term`, lowercased, is in the built-in lexicon.
pub fn is_stopword(term: &str) -> bool {
    builtin().contains(term.to_lowercase().as_str())
}

/// The built-in lexicon plus any caller-supplied words.
#[derive(Debug, Clone, Default)]
pub struct StopwordFilter {
    extra: HashSet<String>,
}

impl StopwordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the lexicon. Words are lowercased.
    pub fn with_extra<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra
            .extend(words.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
        self
    }

    pub fn contains(&self, term: &str) -> bool {
        let lower = term.to_lowercase();
        builtin().contains(lower.as_str()) || self.extra.contains(&lower)
    }

    pub fn len(&self) -> usize {
        builtin().len() + self.extra.iter().filter(|w| !builtin().contains(w.as_str())).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
