//! Publication-level descriptive metadata.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Value};

use super::json::{self, ConsumingObject};
use super::link::{Link, links_from_json, links_to_json};
use crate::error::{Error, Result};
use crate::warning::{Severity, Warning, WarningLogger};

/// Direction in which the reading order is meant to be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReadingProgression {
    Ltr,
    Rtl,
    Ttb,
    Btt,
    #[default]
    Auto,
}

impl ReadingProgression {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingProgression::Ltr => "ltr",
            ReadingProgression::Rtl => "rtl",
            ReadingProgression::Ttb => "ttb",
            ReadingProgression::Btt => "btt",
            ReadingProgression::Auto => "auto",
        }
    }

    /// Parse a manifest or OPF value; `default` and unknown values are `Auto`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "ltr" => ReadingProgression::Ltr,
            "rtl" => ReadingProgression::Rtl,
            "ttb" => ReadingProgression::Ttb,
            "btt" => ReadingProgression::Btt,
            _ => ReadingProgression::Auto,
        }
    }
}

/// A conformance profile URI.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Profile(Cow<'static, str>);

impl Profile {
    pub const EPUB: Profile =
        Profile(Cow::Borrowed("https://readium.org/webpub-manifest/profiles/epub"));
    pub const AUDIOBOOK: Profile =
        Profile(Cow::Borrowed("https://readium.org/webpub-manifest/profiles/audiobook"));
    pub const DIVINA: Profile =
        Profile(Cow::Borrowed("https://readium.org/webpub-manifest/profiles/divina"));
    pub const PDF: Profile =
        Profile(Cow::Borrowed("https://readium.org/webpub-manifest/profiles/pdf"));

    pub fn new(uri: impl Into<String>) -> Self {
        Profile(Cow::Owned(uri.into()))
    }

    pub fn uri(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A string that is either plain or translated (language tag -> value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalizedString {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Default for LocalizedString {
    fn default() -> Self {
        LocalizedString::Plain(String::new())
    }
}

impl From<&str> for LocalizedString {
    fn from(s: &str) -> Self {
        LocalizedString::Plain(s.to_string())
    }
}

impl From<String> for LocalizedString {
    fn from(s: String) -> Self {
        LocalizedString::Plain(s)
    }
}

impl LocalizedString {
    /// The default translation: plain value, else `en`, else `und`, else the
    /// first one.
    pub fn string(&self) -> &str {
        match self {
            LocalizedString::Plain(s) => s,
            LocalizedString::Localized(map) => map
                .get("en")
                .or_else(|| map.get("und"))
                .or_else(|| map.values().next())
                .map(String::as_str)
                .unwrap_or_default(),
        }
    }

    pub fn from_json(json: &Value) -> Option<Self> {
        match json {
            Value::String(s) => Some(LocalizedString::Plain(s.clone())),
            Value::Object(map) => {
                let translations: BTreeMap<String, String> = map
                    .iter()
                    .filter_map(|(lang, v)| v.as_str().map(|s| (lang.clone(), s.to_string())))
                    .collect();
                (!translations.is_empty()).then_some(LocalizedString::Localized(translations))
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            LocalizedString::Plain(s) => Value::String(s.clone()),
            LocalizedString::Localized(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        }
    }
}

/// A person or organization credited in the metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contributor {
    pub name: LocalizedString,
    pub identifier: Option<String>,
    pub sort_as: Option<String>,
    pub roles: Vec<String>,
    pub links: Vec<Link>,
}

impl Contributor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: LocalizedString::Plain(name.into()),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    fn from_json(json: &Value, warnings: &mut dyn WarningLogger) -> Option<Self> {
        match json {
            Value::String(name) => Some(Contributor::new(name.clone())),
            Value::Object(map) => {
                let mut obj = ConsumingObject::new(map);
                let name = obj.take("name").and_then(LocalizedString::from_json)?;
                Some(Self {
                    name,
                    identifier: json::string(obj.take("identifier")),
                    sort_as: json::string(obj.take("sortAs")),
                    roles: json::string_array(obj.take("role")),
                    links: links_from_json(obj.take("links"), warnings),
                })
            }
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        let name_only = self.identifier.is_none()
            && self.sort_as.is_none()
            && self.roles.is_empty()
            && self.links.is_empty();
        if name_only && let LocalizedString::Plain(name) = &self.name {
            return Value::String(name.clone());
        }

        let mut map = Map::new();
        map.insert("name".into(), self.name.to_json());
        json::insert_opt(&mut map, "identifier", self.identifier.clone());
        json::insert_opt(&mut map, "sortAs", self.sort_as.clone());
        json::insert_strings(&mut map, "role", &self.roles);
        if !self.links.is_empty() {
            map.insert("links".into(), links_to_json(&self.links));
        }
        Value::Object(map)
    }
}

/// Parse a contributor value: a string, an object or an array of either.
fn contributors_from_json(
    json: Option<&Value>,
    role: &'static str,
    warnings: &mut dyn WarningLogger,
) -> Vec<Contributor> {
    let items: Vec<&Value> = match json {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
        None => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| {
            let contributor = Contributor::from_json(item, warnings);
            if contributor.is_none() {
                warnings.log(
                    Warning::new(Severity::Minor, "Contributor", format!("invalid {role}"))
                        .with_source(item),
                );
            }
            contributor
        })
        .collect()
}

fn contributors_to_json(map: &mut Map<String, Value>, key: &str, contributors: &[Contributor]) {
    if !contributors.is_empty() {
        map.insert(
            key.to_string(),
            Value::Array(contributors.iter().map(Contributor::to_json).collect()),
        );
    }
}

/// Subjects are strings or objects with a `name`; only the name is kept.
fn subjects_from_json(json: Option<&Value>) -> Vec<String> {
    let items: Vec<&Value> = match json {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
        None => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("name")
                .and_then(LocalizedString::from_json)
                .map(|name| name.string().to_string()),
            _ => None,
        })
        .collect()
}

/// Descriptive metadata of a publication.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub identifier: Option<String>,
    /// Schema.org type (JSON `@type`).
    pub r#type: Option<String>,
    /// Profiles the publication declares conformance to.
    pub conforms_to: BTreeSet<Profile>,
    pub title: LocalizedString,
    pub subtitle: Option<LocalizedString>,
    pub modified: Option<String>,
    pub published: Option<String>,
    /// BCP 47 language tags, in declaration order.
    pub languages: Vec<String>,
    pub sort_as: Option<String>,
    pub authors: Vec<Contributor>,
    pub translators: Vec<Contributor>,
    pub editors: Vec<Contributor>,
    pub contributors: Vec<Contributor>,
    pub publishers: Vec<Contributor>,
    pub subjects: Vec<String>,
    /// Declared reading progression.
    pub reading_progression: ReadingProgression,
    pub description: Option<String>,
    pub number_of_pages: Option<u32>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Keys this model doesn't know, kept verbatim.
    pub other_metadata: Map<String, Value>,
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: LocalizedString::Plain(title.into()),
            ..Default::default()
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(Contributor::new(author));
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.conforms_to.insert(profile);
        self
    }

    pub fn with_reading_progression(mut self, progression: ReadingProgression) -> Self {
        self.reading_progression = progression;
        self
    }

    /// Reading progression to use when laying out the publication.
    ///
    /// A declared direction other than `auto` wins. Otherwise it is derived
    /// from the language, and only when exactly one language is declared.
    pub fn effective_reading_progression(&self) -> ReadingProgression {
        if self.reading_progression != ReadingProgression::Auto {
            return self.reading_progression;
        }

        let [language] = self.languages.as_slice() else {
            return ReadingProgression::Ltr;
        };
        let language = language.to_ascii_lowercase();
        if language == "zh-hant" || language == "zh-tw" {
            return ReadingProgression::Rtl;
        }

        // The region is ignored for ar, fa and he.
        match language.split('-').next().unwrap_or_default() {
            "ar" | "fa" | "he" => ReadingProgression::Rtl,
            _ => ReadingProgression::Ltr,
        }
    }

    /// Parse a metadata object. `title` is required.
    pub fn from_json(json: &Value, warnings: &mut dyn WarningLogger) -> Result<Self> {
        let map = json
            .as_object()
            .ok_or_else(|| Error::MalformedDocument("metadata must be an object".into()))?;
        let mut obj = ConsumingObject::new(map);

        let title = obj
            .take("title")
            .and_then(LocalizedString::from_json)
            .ok_or_else(|| Error::MalformedDocument("metadata requires a title".into()))?;

        let reading_progression = obj
            .take("readingProgression")
            .and_then(Value::as_str)
            .map(ReadingProgression::parse)
            .unwrap_or_default();

        let metadata = Self {
            identifier: json::string(obj.take("identifier")),
            r#type: json::string(obj.take("@type")),
            conforms_to: json::string_array(obj.take("conformsTo"))
                .into_iter()
                .map(Profile::new)
                .collect(),
            title,
            subtitle: obj.take("subtitle").and_then(LocalizedString::from_json),
            modified: json::string(obj.take("modified")),
            published: json::string(obj.take("published")),
            languages: json::string_array(obj.take("language")),
            sort_as: json::string(obj.take("sortAs")),
            authors: contributors_from_json(obj.take("author"), "author", warnings),
            translators: contributors_from_json(obj.take("translator"), "translator", warnings),
            editors: contributors_from_json(obj.take("editor"), "editor", warnings),
            contributors: contributors_from_json(obj.take("contributor"), "contributor", warnings),
            publishers: contributors_from_json(obj.take("publisher"), "publisher", warnings),
            subjects: subjects_from_json(obj.take("subject")),
            reading_progression,
            description: json::string(obj.take("description")),
            number_of_pages: json::positive_u32(obj.take("numberOfPages")),
            duration: json::positive_f64(obj.take("duration")),
            other_metadata: obj
                .remaining()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        Ok(metadata)
    }

    pub fn to_json(&self) -> Value {
        let mut map = self.other_metadata.clone();
        json::insert_opt(&mut map, "identifier", self.identifier.clone());
        json::insert_opt(&mut map, "@type", self.r#type.clone());
        let profiles: Vec<String> = self.conforms_to.iter().map(|p| p.uri().to_string()).collect();
        json::insert_strings(&mut map, "conformsTo", &profiles);
        map.insert("title".into(), self.title.to_json());
        if let Some(subtitle) = &self.subtitle {
            map.insert("subtitle".into(), subtitle.to_json());
        }
        json::insert_opt(&mut map, "modified", self.modified.clone());
        json::insert_opt(&mut map, "published", self.published.clone());
        json::insert_strings(&mut map, "language", &self.languages);
        json::insert_opt(&mut map, "sortAs", self.sort_as.clone());
        contributors_to_json(&mut map, "author", &self.authors);
        contributors_to_json(&mut map, "translator", &self.translators);
        contributors_to_json(&mut map, "editor", &self.editors);
        contributors_to_json(&mut map, "contributor", &self.contributors);
        contributors_to_json(&mut map, "publisher", &self.publishers);
        json::insert_strings(&mut map, "subject", &self.subjects);
        if self.reading_progression != ReadingProgression::Auto {
            map.insert(
                "readingProgression".into(),
                Value::String(self.reading_progression.as_str().into()),
            );
        }
        json::insert_opt(&mut map, "description", self.description.clone());
        json::insert_opt(&mut map, "numberOfPages", self.number_of_pages);
        json::insert_opt(&mut map, "duration", self.duration);
        Value::Object(map)
    }
}
