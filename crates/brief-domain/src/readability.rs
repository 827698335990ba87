//! Métrica determinista de legibilidad.
//!
//! Puntaje en [0,1] derivado de la longitud media de oración y de palabra:
//! oraciones cortas con palabras cortas puntúan alto. No pretende ser un
//! índice lingüístico serio; es estable, barato y suficiente para que un
//! revisor derive su dimensión de claridad.

/// Longitudes de referencia: por encima de estos valores el puntaje decae
/// linealmente hasta saturar en 0.
const IDEAL_SENTENCE_WORDS: f64 = 12.0;
const MAX_SENTENCE_WORDS: f64 = 40.0;
const IDEAL_WORD_CHARS: f64 = 5.0;
const MAX_WORD_CHARS: f64 = 12.0;

fn ratio_below(value: f64, ideal: f64, max: f64) -> f64 {
    if value <= ideal {
        return 1.0;
    }
    if value >= max {
        return 0.0;
    }
    1.0 - (value - ideal) / (max - ideal)
}

/// Calcula el puntaje de legibilidad de un texto.
///
/// Texto vacío o sin palabras puntúa 0.0.
pub fn readability_score(text: &str) -> f64 {
    let sentences: Vec<&str> = text.split(['.', '!', '?'])
                                   .map(str::trim)
                                   .filter(|s| !s.is_empty())
                                   .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let mut word_count = 0usize;
    let mut char_count = 0usize;
    for s in &sentences {
        for w in s.split_whitespace() {
            word_count += 1;
            char_count += w.chars().count();
        }
    }
    if word_count == 0 {
        return 0.0;
    }
    let words_per_sentence = word_count as f64 / sentences.len() as f64;
    let chars_per_word = char_count as f64 / word_count as f64;

    let sentence_score = ratio_below(words_per_sentence, IDEAL_SENTENCE_WORDS, MAX_SENTENCE_WORDS);
    let word_score = ratio_below(chars_per_word, IDEAL_WORD_CHARS, MAX_WORD_CHARS);
    (sentence_score + word_score) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sentences_score_high() {
        let score = readability_score("The rule is new. It starts in May. Fines go up.");
        assert!(score > 0.9, "got {}", score);
    }

    #[test]
    fn dense_prose_scores_lower() {
        let dense = "Notwithstanding heretofore promulgated administrative determinations, the \
                     aforementioned jurisdictional prerequisites necessitate comprehensive \
                     documentation accompanying every individualized adjudicatory disposition \
                     rendered pursuant to the enabling instrument as subsequently amended";
        let score = readability_score(dense);
        assert!(score < 0.5, "got {}", score);
    }

    #[test]
    fn empty_text_scores_zero() {
        assert_eq!(readability_score(""), 0.0);
        assert_eq!(readability_score("..."), 0.0);
    }
}
