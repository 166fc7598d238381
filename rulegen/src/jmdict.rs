//! Streaming JMDict (Japanese-English dictionary XML) loader.
//!
//! Reads entries event-by-event rather than building a DOM; the full file
//! is around half a million entries. Each entry keeps every kanji and kana
//! surface (the first of each is the primary), English glosses in document
//! order and the first part-of-speech tag.

use crate::error::{Result, RulegenError};
use crate::romaji::kana_to_romaji;
use ahash::AHashMap;
use lexishift_core::{CoreError, LemmaProvider, ScriptForms, WordPackage};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JmdictEntry {
    /// Headword: first kanji surface, or the reading for kana-only words.
    pub term: String,
    /// First kana reading.
    pub reading: String,
    /// Every keb and reb surface, in document order.
    pub surfaces: Vec<String>,
    /// English glosses in document order across all senses.
    pub glosses: Vec<String>,
    pub pos: Option<String>,
}

/// In-memory JMDict index keyed by headword and reading.
#[derive(Debug)]
pub struct JmdictIndex {
    entries: Vec<JmdictEntry>,
    by_surface: AHashMap<String, usize>,
}

#[derive(PartialEq)]
enum Field {
    None,
    Keb,
    Reb,
    Pos,
    Gloss { english: bool },
}

fn decode_text(raw: &[u8]) -> String {
    // JMDict abbreviates pos tags as custom entities; keep them raw
    // rather than failing the unescape.
    let text = match quick_xml::escape::unescape(&String::from_utf8_lossy(raw)) {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    };
    // kana with combining voicing marks must match composed lookups
    text.nfc().collect()
}

/// "&n;" -> "n". Pos tags arrive as entity references in the raw stream.
fn strip_entity(tag: &str) -> String {
    tag.trim()
        .trim_start_matches('&')
        .trim_end_matches(';')
        .to_string()
}

impl JmdictIndex {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::missing(path).into());
        }
        let file = File::open(path)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text(true);

        let mut entries: Vec<JmdictEntry> = Vec::new();
        let mut current = JmdictEntry::default();
        let mut field = Field::None;
        let mut buf = Vec::new();

        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| RulegenError::xml(path, e))?
            {
                Event::Start(e) => match e.name().as_ref() {
                    b"entry" => current = JmdictEntry::default(),
                    b"keb" => field = Field::Keb,
                    b"reb" => field = Field::Reb,
                    b"pos" => field = Field::Pos,
                    b"gloss" => {
                        let lang = e
                            .try_get_attribute("xml:lang")
                            .map_err(|e| RulegenError::xml(path, e.into()))?
                            .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                        // missing xml:lang means English in JMDict
                        let english =
                            matches!(lang.as_deref(), None | Some("eng") | Some("en"));
                        field = Field::Gloss { english };
                    }
                    _ => {}
                },
                Event::Text(e) => match field {
                    Field::Keb => {
                        let text = decode_text(&e);
                        if current.term.is_empty() {
                            current.term = text.clone();
                        }
                        current.surfaces.push(text);
                    }
                    Field::Reb => {
                        let text = decode_text(&e);
                        if current.reading.is_empty() {
                            current.reading = text.clone();
                        }
                        current.surfaces.push(text);
                    }
                    Field::Pos if current.pos.is_none() => {
                        current.pos = Some(strip_entity(&decode_text(&e)));
                    }
                    Field::Gloss { english: true } => {
                        current.glosses.push(decode_text(&e));
                    }
                    _ => {}
                },
                Event::End(e) => {
                    match e.name().as_ref() {
                        b"entry" => {
                            if current.term.is_empty() {
                                current.term = current.reading.clone();
                            }
                            if !current.term.is_empty() {
                                entries.push(std::mem::take(&mut current));
                            }
                        }
                        _ => {}
                    }
                    field = Field::None;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let mut by_surface = AHashMap::with_capacity(entries.len() * 2);
        for (idx, entry) in entries.iter().enumerate() {
            // term covers the kana-only case where it mirrors the reading
            by_surface.entry(entry.term.clone()).or_insert(idx);
            for surface in &entry.surfaces {
                by_surface.entry(surface.clone()).or_insert(idx);
            }
        }
        info!(path = %path.display(), entries = entries.len(), "loaded jmdict");
        Ok(Self {
            entries,
            by_surface,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[JmdictEntry] {
        &self.entries
    }

    pub fn get(&self, surface: &str) -> Option<&JmdictEntry> {
        self.by_surface.get(surface).map(|&i| &self.entries[i])
    }

    /// Script surface table for an entry: kanji, kana and derived romaji.
    pub fn script_forms(entry: &JmdictEntry) -> ScriptForms {
        ScriptForms {
            kanji: (!entry.term.is_empty() && entry.term != entry.reading)
                .then(|| entry.term.clone()),
            kana: (!entry.reading.is_empty()).then(|| entry.reading.clone()),
            romaji: kana_to_romaji(&entry.reading),
        }
    }
}

impl LemmaProvider for JmdictIndex {
    fn contains(&self, lemma: &str) -> bool {
        self.by_surface.contains_key(lemma)
    }

    fn word_package(&self, lemma: &str, language_tag: &str) -> Option<WordPackage> {
        let entry = self.get(lemma)?;
        Some(WordPackage {
            lemma: entry.term.clone(),
            language_tag: language_tag.to_string(),
            reading: (!entry.reading.is_empty()).then(|| entry.reading.clone()),
            script_forms: Some(Self::script_forms(entry)),
            pos: entry.pos.clone(),
            frequency_rank: None,
            provider: Some("jmdict".to_string()),
        })
    }
}
