//! Kana to Hepburn-style romaji transliteration.
//!
//! Katakana is folded to hiragana first, so a katakana reading and its
//! hiragana equivalent always romanize identically. Long vowels are written
//! out ("koohii"), not macronned.

use phf::phf_map;

static KANA: phf::Map<char, &'static str> = phf_map! {
    'あ' => "a", 'い' => "i", 'う' => "u", 'え' => "e", 'お' => "o",
    'か' => "ka", 'き' => "ki", 'く' => "ku", 'け' => "ke", 'こ' => "ko",
    'が' => "ga", 'ぎ' => "gi", 'ぐ' => "gu", 'げ' => "ge", 'ご' => "go",
    'さ' => "sa", 'し' => "shi", 'す' => "su", 'せ' => "se", 'そ' => "so",
    'ざ' => "za", 'じ' => "ji", 'ず' => "zu", 'ぜ' => "ze", 'ぞ' => "zo",
    'た' => "ta", 'ち' => "chi", 'つ' => "tsu", 'て' => "te", 'と' => "to",
    'だ' => "da", 'ぢ' => "ji", 'づ' => "zu", 'で' => "de", 'ど' => "do",
    'な' => "na", 'に' => "ni", 'ぬ' => "nu", 'ね' => "ne", 'の' => "no",
    'は' => "ha", 'ひ' => "hi", 'ふ' => "fu", 'へ' => "he", 'ほ' => "ho",
    'ば' => "ba", 'び' => "bi", 'ぶ' => "bu", 'べ' => "be", 'ぼ' => "bo",
    'ぱ' => "pa", 'ぴ' => "pi", 'ぷ' => "pu", 'ぺ' => "pe", 'ぽ' => "po",
    'ま' => "ma", 'み' => "mi", 'む' => "mu", 'め' => "me", 'も' => "mo",
    'や' => "ya", 'ゆ' => "yu", 'よ' => "yo",
    'ら' => "ra", 'り' => "ri", 'る' => "ru", 'れ' => "re", 'ろ' => "ro",
    'わ' => "wa", 'ゐ' => "wi", 'ゑ' => "we", 'を' => "o",
    'ん' => "n", 'ゔ' => "vu",
    'ぁ' => "a", 'ぃ' => "i", 'ぅ' => "u", 'ぇ' => "e", 'ぉ' => "o",
    'ゃ' => "ya", 'ゅ' => "yu", 'ょ' => "yo",
};

/// Fold a katakana code point into its hiragana twin. The katakana block
/// U+30A1..=U+30F6 sits exactly 0x60 above hiragana.
pub fn fold_katakana(c: char) -> char {
    if ('\u{30A1}'..='\u{30F6}').contains(&c) {
        char::from_u32(c as u32 - 0x60).unwrap_or(c)
    } else {
        c
    }
}

fn small_yoon_vowel(c: char) -> Option<&'static str> {
    match c {
        'ゃ' => Some("a"),
        'ゅ' => Some("u"),
        'ょ' => Some("o"),
        _ => None,
    }
}

fn combine_yoon(base: &str, vowel: &str) -> Option<String> {
    let stem = base.strip_suffix('i')?;
    match stem {
        "sh" | "ch" | "j" => Some(format!("{}{}", stem, vowel)),
        "" => None,
        _ => Some(format!("{}y{}", stem, vowel)),
    }
}

/// Transliterate a kana string; returns None when a non-kana character is
/// present. The empty string transliterates to itself.
pub fn kana_to_romaji(kana: &str) -> Option<String> {
    let chars: Vec<char> = kana.chars().map(fold_katakana).collect();
    let mut out = String::with_capacity(kana.len() * 2);
    let mut sokuon = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == 'っ' {
            sokuon = true;
            i += 1;
            continue;
        }
        if c == 'ー' {
            // chouon repeats the previous vowel
            let last_vowel = out.chars().rev().find(|ch| "aeiou".contains(*ch))?;
            out.push(last_vowel);
            i += 1;
            continue;
        }
        let base = *KANA.get(&c)?;
        let syllable = match chars.get(i + 1).copied().and_then(small_yoon_vowel) {
            Some(vowel) => match combine_yoon(base, vowel) {
                Some(s) => {
                    i += 2;
                    s
                }
                None => {
                    i += 1;
                    base.to_string()
                }
            },
            None => {
                i += 1;
                base.to_string()
            }
        };
        if sokuon {
            sokuon = false;
            if syllable.starts_with("ch") {
                out.push('t');
            } else if let Some(first) = syllable.chars().next() {
                if !"aeiou".contains(first) {
                    out.push(first);
                }
            }
        }
        out.push_str(&syllable);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_syllables() {
        assert_eq!(kana_to_romaji("ねこ").as_deref(), Some("neko"));
        assert_eq!(kana_to_romaji("いぬ").as_deref(), Some("inu"));
        assert_eq!(kana_to_romaji("さかな").as_deref(), Some("sakana"));
    }

    #[test]
    fn katakana_folds_to_same_romaji() {
        assert_eq!(kana_to_romaji("ネコ"), kana_to_romaji("ねこ"));
        assert_eq!(kana_to_romaji("パン").as_deref(), Some("pan"));
    }

    #[test]
    fn yoon_digraphs() {
        assert_eq!(kana_to_romaji("きょう").as_deref(), Some("kyou"));
        assert_eq!(kana_to_romaji("しゃしん").as_deref(), Some("shashin"));
        assert_eq!(kana_to_romaji("ちゃ").as_deref(), Some("cha"));
        assert_eq!(kana_to_romaji("じゅう").as_deref(), Some("juu"));
    }

    #[test]
    fn sokuon_doubles_next_consonant() {
        assert_eq!(kana_to_romaji("がっこう").as_deref(), Some("gakkou"));
        assert_eq!(kana_to_romaji("ざっし").as_deref(), Some("zasshi"));
        assert_eq!(kana_to_romaji("まっちゃ").as_deref(), Some("matcha"));
    }

    #[test]
    fn chouon_repeats_vowel() {
        assert_eq!(kana_to_romaji("コーヒー").as_deref(), Some("koohii"));
    }

    #[test]
    fn non_kana_rejected() {
        assert_eq!(kana_to_romaji("猫"), None);
        assert_eq!(kana_to_romaji("neko"), None);
        assert_eq!(kana_to_romaji("").as_deref(), Some(""));
    }
}
