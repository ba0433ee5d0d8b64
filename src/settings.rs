//! Allowed values and process-wide defaults for the three request settings.
//!
//! The tables are built once and never written afterwards, so concurrent
//! requests read them without coordination.

use chrono::FixedOffset;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Escaping mode applied by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Undefined,
    PlainText,
    Html,
    Xhtml,
    Xml,
    Rtf,
}

impl OutputFormat {
    /// The token a client sends to select this format.
    pub fn token(&self) -> &'static str {
        match self {
            OutputFormat::Undefined => "undefined",
            OutputFormat::PlainText => "plainText",
            OutputFormat::Html => "HTML",
            OutputFormat::Xhtml => "XHTML",
            OutputFormat::Xml => "XML",
            OutputFormat::Rtf => "RTF",
        }
    }

    /// Whether the engine escapes interpolated values for this format.
    pub fn escapes(&self) -> bool {
        matches!(
            self,
            OutputFormat::Html | OutputFormat::Xhtml | OutputFormat::Xml
        )
    }
}

/// A time zone the service knows about: IANA-style name plus its standard
/// UTC offset. Offsets are fixed; this service does not model DST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimeZone {
    pub name: &'static str,
    pub offset: FixedOffset,
}

static OUTPUT_FORMATS: Lazy<HashMap<&'static str, OutputFormat>> = Lazy::new(|| {
    [
        OutputFormat::Undefined,
        OutputFormat::PlainText,
        OutputFormat::Html,
        OutputFormat::Xhtml,
        OutputFormat::Xml,
        OutputFormat::Rtf,
    ]
    .into_iter()
    .map(|format| (format.token(), format))
    .collect()
});

const LOCALE_TAGS: &[&str] = &[
    "ar_SA", "cs_CZ", "da_DK", "de", "de_AT", "de_CH", "de_DE", "el_GR", "en", "en_AU", "en_CA",
    "en_GB", "en_IE", "en_IN", "en_NZ", "en_US", "es", "es_AR", "es_ES", "es_MX", "fi_FI", "fr",
    "fr_BE", "fr_CA", "fr_CH", "fr_FR", "he_IL", "hi_IN", "hu_HU", "it_CH", "it_IT", "ja_JP",
    "ko_KR", "nb_NO", "nl_BE", "nl_NL", "pl_PL", "pt_BR", "pt_PT", "ro_RO", "ru_RU", "sv_SE",
    "th_TH", "tr_TR", "uk_UA", "zh_CN", "zh_TW",
];

static LOCALES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| LOCALE_TAGS.iter().map(|tag| (*tag, *tag)).collect());

/// (name, standard UTC offset in seconds)
const TIME_ZONE_OFFSETS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("Africa/Cairo", 2 * 3600),
    ("Africa/Johannesburg", 2 * 3600),
    ("America/Chicago", -6 * 3600),
    ("America/Denver", -7 * 3600),
    ("America/Los_Angeles", -8 * 3600),
    ("America/Mexico_City", -6 * 3600),
    ("America/New_York", -5 * 3600),
    ("America/Sao_Paulo", -3 * 3600),
    ("America/Toronto", -5 * 3600),
    ("Asia/Dubai", 4 * 3600),
    ("Asia/Hong_Kong", 8 * 3600),
    ("Asia/Kolkata", 5 * 3600 + 1800),
    ("Asia/Seoul", 9 * 3600),
    ("Asia/Shanghai", 8 * 3600),
    ("Asia/Singapore", 8 * 3600),
    ("Asia/Tokyo", 9 * 3600),
    ("Australia/Perth", 8 * 3600),
    ("Australia/Sydney", 10 * 3600),
    ("Europe/Amsterdam", 3600),
    ("Europe/Athens", 2 * 3600),
    ("Europe/Berlin", 3600),
    ("Europe/Helsinki", 2 * 3600),
    ("Europe/London", 0),
    ("Europe/Madrid", 3600),
    ("Europe/Moscow", 3 * 3600),
    ("Europe/Paris", 3600),
    ("Europe/Rome", 3600),
    ("Europe/Warsaw", 3600),
    ("Pacific/Auckland", 12 * 3600),
];

static TIME_ZONES: Lazy<HashMap<&'static str, ResolvedTimeZone>> = Lazy::new(|| {
    TIME_ZONE_OFFSETS
        .iter()
        .map(|(name, secs)| {
            let offset = FixedOffset::east_opt(*secs).expect("time zone offset in range");
            (*name, ResolvedTimeZone { name, offset })
        })
        .collect()
});

pub fn resolve_output_format(token: &str) -> Option<OutputFormat> {
    OUTPUT_FORMATS.get(token).copied()
}

pub fn default_output_format() -> OutputFormat {
    OutputFormat::Undefined
}

pub fn resolve_locale(token: &str) -> Option<&'static str> {
    LOCALES.get(token).copied()
}

pub fn default_locale() -> &'static str {
    "en_US"
}

pub fn resolve_time_zone(token: &str) -> Option<ResolvedTimeZone> {
    TIME_ZONES.get(token).copied()
}

pub fn default_time_zone() -> ResolvedTimeZone {
    *TIME_ZONES.get("UTC").expect("UTC present in time zone table")
}
