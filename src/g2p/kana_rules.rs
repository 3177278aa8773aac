//! Kana → IPA-ish phoneme rewrite table (G2P cascade levels 4 and 5).
//!
//! The table is ordered longest-match-first: two-character yoon combos
//! (`きゃ`, `しゅ`, ...) are tried before single-mora entries. Keys are
//! Katakana; callers normalize Hiragana input via
//! [`crate::segmenter::hiragana_to_katakana`] before applying the table, so
//! a single table serves both scripts (the "Hiragana+Katakana rule table"
//! called out for the last-resort step).

use crate::segmenter::hiragana_to_katakana;

/// Two-character yoon (palatalized) combinations, tried first.
const YOON: &[(&str, &str)] = &[
    ("キャ", "k j a"), ("キュ", "k j u"), ("キョ", "k j o"),
    ("ギャ", "g j a"), ("ギュ", "g j u"), ("ギョ", "g j o"),
    ("シャ", "ʃ a"), ("シュ", "ʃ u"), ("ショ", "ʃ o"),
    ("ジャ", "dʒ a"), ("ジュ", "dʒ u"), ("ジョ", "dʒ o"),
    ("チャ", "tɕ a"), ("チュ", "tɕ u"), ("チョ", "tɕ o"),
    ("ニャ", "ɲ a"), ("ニュ", "ɲ u"), ("ニョ", "ɲ o"),
    ("ヒャ", "h j a"), ("ヒュ", "h j u"), ("ヒョ", "h j o"),
    ("ビャ", "b j a"), ("ビュ", "b j u"), ("ビョ", "b j o"),
    ("ピャ", "p j a"), ("ピュ", "p j u"), ("ピョ", "p j o"),
    ("ミャ", "m j a"), ("ミュ", "m j u"), ("ミョ", "m j o"),
    ("リャ", "r j a"), ("リュ", "r j u"), ("リョ", "r j o"),
];

/// Single-mora (CV / V) entries.
const MORA: &[(&str, &str)] = &[
    ("ア", "a"), ("イ", "i"), ("ウ", "u"), ("エ", "e"), ("オ", "o"),
    ("カ", "k a"), ("キ", "k i"), ("ク", "k u"), ("ケ", "k e"), ("コ", "k o"),
    ("ガ", "g a"), ("ギ", "g i"), ("グ", "g u"), ("ゲ", "g e"), ("ゴ", "g o"),
    ("サ", "s a"), ("シ", "ʃ i"), ("ス", "s u"), ("セ", "s e"), ("ソ", "s o"),
    ("ザ", "z a"), ("ジ", "dʒ i"), ("ズ", "z u"), ("ゼ", "z e"), ("ゾ", "z o"),
    ("タ", "t a"), ("チ", "tɕ i"), ("ツ", "ts u"), ("テ", "t e"), ("ト", "t o"),
    ("ダ", "d a"), ("ヂ", "dʒ i"), ("ヅ", "z u"), ("デ", "d e"), ("ド", "d o"),
    ("ナ", "n a"), ("ニ", "n i"), ("ヌ", "n u"), ("ネ", "n e"), ("ノ", "n o"),
    ("ハ", "h a"), ("ヒ", "h i"), ("フ", "ɸ u"), ("ヘ", "h e"), ("ホ", "h o"),
    ("バ", "b a"), ("ビ", "b i"), ("ブ", "b u"), ("ベ", "b e"), ("ボ", "b o"),
    ("パ", "p a"), ("ピ", "p i"), ("プ", "p u"), ("ペ", "p e"), ("ポ", "p o"),
    ("マ", "m a"), ("ミ", "m i"), ("ム", "m u"), ("メ", "m e"), ("モ", "m o"),
    ("ヤ", "y a"), ("ユ", "y u"), ("ヨ", "y o"),
    ("ラ", "r a"), ("リ", "r i"), ("ル", "r u"), ("レ", "r e"), ("ロ", "r o"),
    ("ワ", "w a"), ("ヲ", "o"),
    // Small kana standalone (not part of a yoon combo matched above).
    ("ァ", "a"), ("ィ", "i"), ("ゥ", "u"), ("ェ", "e"), ("ォ", "o"),
    ("ャ", "y a"), ("ュ", "y u"), ("ョ", "y o"),
];

/// Geminate marker (small tsu). Post-processing doubles the following
/// consonant; here it simply emits the `q` marker symbol.
const GEMINATE: &str = "ッ";
/// Moraic nasal.
const MORAIC_N: &str = "ン";
/// Long vowel mark: duplicates the preceding vowel.
const LONG_VOWEL: &str = "ー";

fn lookup_yoon(s: &str) -> Option<&'static str> {
    YOON.iter().find(|(k, _)| *k == s).map(|(_, v)| *v)
}

fn lookup_mora(s: &str) -> Option<&'static str> {
    MORA.iter().find(|(k, _)| *k == s).map(|(_, v)| *v)
}

fn last_vowel(symbols: &[&str]) -> Option<&'static str> {
    for s in symbols.iter().rev() {
        for v in ["a", "i", "u", "e", "o"] {
            if *s == v {
                return Some(v);
            }
        }
    }
    None
}

/// Transliterate a kana string (Hiragana or Katakana) into a space-joined
/// phoneme string via the ordered longest-match rewrite table.
///
/// Leftover non-kana characters pass through unchanged as their own token.
#[must_use]
pub fn transliterate(input: &str) -> String {
    let katakana = hiragana_to_katakana(input);
    let chars: Vec<char> = katakana.chars().collect();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        // Two-character yoon lookup first (longest match).
        if i + 1 < chars.len() {
            let two: String = chars[i..i + 2].iter().collect();
            if let Some(phon) = lookup_yoon(&two) {
                out.extend(phon.split(' ').map(str::to_owned));
                i += 2;
                continue;
            }
        }

        let one: String = chars[i].to_string();

        if one == GEMINATE {
            out.push("q".to_owned());
            i += 1;
            continue;
        }

        if one == MORAIC_N {
            out.push("ɴ".to_owned());
            i += 1;
            continue;
        }

        if one == LONG_VOWEL {
            let refs: Vec<&str> = out.iter().map(String::as_str).collect();
            if let Some(v) = last_vowel(&refs) {
                out.push(v.to_owned());
            }
            i += 1;
            continue;
        }

        if let Some(phon) = lookup_mora(&one) {
            out.extend(phon.split(' ').map(str::to_owned));
        } else {
            out.push(one);
        }
        i += 1;
    }

    out.join(" ")
}

/// Realize `q` + voiceless-stop geminate markers as a doubled consonant:
/// `q k` → `k k`, i.e. drop the `q` and duplicate the following consonant
/// symbol. Applied as the final G2P post-processing step.
#[must_use]
pub fn realize_geminates(phonemes: &str) -> String {
    let tokens: Vec<&str> = phonemes.split_whitespace().collect();
    let mut out: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == "q"
            && i + 1 < tokens.len()
            && matches!(tokens[i + 1], "k" | "s" | "t" | "p" | "h" | "ʃ" | "tɕ" | "ts")
        {
            out.push(tokens[i + 1]);
            out.push(tokens[i + 1]);
            i += 2;
        } else {
            out.push(tokens[i]);
            i += 1;
        }
    }
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliterates_simple_vowels() {
        assert_eq!(transliterate("あいうえお"), "a i u e o");
    }

    #[test]
    fn transliterates_k_row() {
        assert_eq!(transliterate("かきくけこ"), "k a k i k u k e k o");
    }

    #[test]
    fn transliterates_yoon_before_single_mora() {
        assert_eq!(transliterate("きゃ"), "k j a");
        assert_eq!(transliterate("しゃ"), "ʃ a");
    }

    #[test]
    fn moraic_n_maps_to_nasal_symbol() {
        assert_eq!(transliterate("ほん"), "h o ɴ");
    }

    #[test]
    fn geminate_marker_emits_q() {
        assert_eq!(transliterate("がっこう"), "g a q k o u");
    }

    #[test]
    fn long_vowel_mark_duplicates_preceding_vowel() {
        assert_eq!(transliterate("コーヒー"), "k o o h i i");
    }

    #[test]
    fn accepts_hiragana_and_katakana_interchangeably() {
        assert_eq!(transliterate("ほん"), transliterate("ホン"));
    }

    #[test]
    fn realize_geminates_doubles_following_consonant() {
        assert_eq!(realize_geminates("g a q k o u"), "g a k k o u");
    }

    #[test]
    fn realize_geminates_is_noop_without_marker() {
        assert_eq!(realize_geminates("k a t a"), "k a t a");
    }
}
