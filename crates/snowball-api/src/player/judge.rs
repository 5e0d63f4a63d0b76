//! Riddle answer judging against the manifest's answer table.

use std::sync::Arc;

use snowball_navigation::domain::ports::AnswerJudge;
use snowball_story::SectionGraph;

/// Folds case, surrounding whitespace, common diacritics and
/// punctuation so that "¡Constancia!" and "constancia" compare equal.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | ';' | ':' | '!' | '¡' | '?' | '¿' | '"' | '\''))
        .map(fold_diacritic)
        .filter(|c| !('\u{300}'..='\u{36f}').contains(c))
        .collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Accepts an answer when it normalizes to one of the riddle's accepted
/// answers.
#[derive(Debug, Clone)]
pub struct ManifestJudge {
    graph: Arc<SectionGraph>,
}

impl ManifestJudge {
    #[must_use]
    pub fn new(graph: Arc<SectionGraph>) -> Self {
        Self { graph }
    }
}

impl AnswerJudge for ManifestJudge {
    fn is_correct(&self, riddle: &str, answer: &str) -> bool {
        let given = normalize_answer(answer);
        if given.is_empty() {
            return false;
        }
        self.graph
            .accepted_answers(riddle)
            .iter()
            .any(|accepted| normalize_answer(accepted) == given)
    }
}
