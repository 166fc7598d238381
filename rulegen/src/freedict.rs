//! Streaming FreeDict TEI loader.
//!
//! FreeDict packs bilingual dictionaries as TEI XML: one `entry` per
//! headword with `form/orth` for the surface and `cit type="trans"` blocks
//! whose `quote` children carry the translations. Grammar lives under
//! `gramGrp/pos` when present. Quotes are filtered to the requested
//! translation language; some packs mix several languages per entry.

use crate::error::{Result, RulegenError};
use ahash::AHashMap;
use lexishift_core::CoreError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FreeDictEntry {
    pub headword: String,
    /// Translations in document order; earlier quotes are the primary
    /// senses.
    pub translations: Vec<String>,
    pub pos: Option<String>,
}

#[derive(Debug)]
pub struct FreeDictIndex {
    entries: Vec<FreeDictEntry>,
    by_headword: AHashMap<String, usize>,
}

#[derive(PartialEq)]
enum Field {
    None,
    Orth,
    Pos,
    Quote,
}

fn decode_text(raw: &[u8]) -> String {
    let text = match quick_xml::escape::unescape(&String::from_utf8_lossy(raw)) {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    };
    // surfaces arrive in both composed and decomposed forms across packs
    text.nfc().collect()
}

/// Fold ISO 639-2 tags onto the two-letter codes the pairs use.
fn normalize_lang_tag(tag: &str) -> &str {
    match tag {
        "eng" => "en",
        "deu" | "ger" => "de",
        "spa" => "es",
        other => other,
    }
}

impl FreeDictIndex {
    /// Load a TEI pack, keeping only translation quotes whose `xml:lang`
    /// is absent or matches `trans_lang`.
    pub fn load<P: AsRef<Path>>(path: P, trans_lang: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::missing(path).into());
        }
        let file = File::open(path)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text(true);
        let want = normalize_lang_tag(trans_lang);

        let mut entries: Vec<FreeDictEntry> = Vec::new();
        let mut current = FreeDictEntry::default();
        let mut field = Field::None;
        let mut in_trans_cit = false;
        let mut buf = Vec::new();

        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| RulegenError::xml(path, e))?
            {
                Event::Start(e) => match e.name().as_ref() {
                    b"entry" => {
                        current = FreeDictEntry::default();
                        in_trans_cit = false;
                    }
                    b"orth" => field = Field::Orth,
                    b"pos" => field = Field::Pos,
                    b"cit" => {
                        let kind = e
                            .try_get_attribute("type")
                            .map_err(|e| RulegenError::xml(path, e.into()))?
                            .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                        in_trans_cit = kind.as_deref() == Some("trans");
                    }
                    b"quote" if in_trans_cit => {
                        let lang = e
                            .try_get_attribute("xml:lang")
                            .map_err(|e| RulegenError::xml(path, e.into()))?
                            .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                        // an untagged quote inherits the pack's language
                        let matches = lang
                            .as_deref()
                            .map(|l| normalize_lang_tag(l) == want)
                            .unwrap_or(true);
                        if matches {
                            field = Field::Quote;
                        }
                    }
                    _ => {}
                },
                Event::Text(e) => match field {
                    Field::Orth if current.headword.is_empty() => {
                        current.headword = decode_text(&e);
                    }
                    Field::Pos if current.pos.is_none() => {
                        current.pos = Some(decode_text(&e));
                    }
                    Field::Quote => {
                        current.translations.push(decode_text(&e));
                    }
                    _ => {}
                },
                Event::End(e) => {
                    match e.name().as_ref() {
                        b"entry" => {
                            if !current.headword.is_empty() {
                                entries.push(std::mem::take(&mut current));
                            }
                        }
                        b"cit" => in_trans_cit = false,
                        _ => {}
                    }
                    field = Field::None;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let mut by_headword = AHashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            by_headword.entry(entry.headword.clone()).or_insert(idx);
        }
        info!(path = %path.display(), entries = entries.len(), "loaded freedict");
        Ok(Self {
            entries,
            by_headword,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FreeDictEntry] {
        &self.entries
    }

    pub fn get(&self, headword: &str) -> Option<&FreeDictEntry> {
        self.by_headword.get(headword).map(|&i| &self.entries[i])
    }
}
