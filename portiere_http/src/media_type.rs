// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use phf::phf_map;
use unicase::UniCase;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaType {
    Common(&'static str),
    Custom(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Common(s) => s,
            MediaType::Custom(s) => s,
        }
    }
}

impl MediaType {
    //
    // General
    //
    pub const OCTET_STREAM: MediaType = MediaType::Common("application/octet-stream");
    pub const MULTIPART_BYTERANGES: MediaType = MediaType::Common("multipart/byteranges");

    //
    // Text
    //
    pub const CASCADING_STYLE_SHEETS: MediaType = MediaType::Common("text/css; charset=utf-8");
    pub const HTML: MediaType = MediaType::Common("text/html; charset=utf-8");
    pub const JAVASCRIPT: MediaType = MediaType::Common("text/javascript; charset=utf-8");
    pub const MARKDOWN: MediaType = MediaType::Common("text/markdown; charset=utf-8");
    pub const PLAIN_TEXT: MediaType = MediaType::Common("text/plain; charset=utf-8");

    //
    // Application
    //
    pub const JSON: MediaType = MediaType::Common("application/json; charset=utf-8");
    pub const PDF: MediaType = MediaType::Common("application/pdf");
    pub const XML: MediaType = MediaType::Common("application/xml; charset=utf-8");
    pub const ZIP: MediaType = MediaType::Common("application/zip");

    //
    // Image
    //
    pub const GIF: MediaType = MediaType::Common("image/gif");
    pub const ICO: MediaType = MediaType::Common("image/x-icon");
    pub const JPEG: MediaType = MediaType::Common("image/jpeg");
    pub const PNG: MediaType = MediaType::Common("image/png");
    pub const SVG: MediaType = MediaType::Common("image/svg+xml");
    pub const WEBP: MediaType = MediaType::Common("image/webp");

    //
    // Audio & Video
    //
    pub const MP3: MediaType = MediaType::Common("audio/mpeg");
    pub const OGG_AUDIO: MediaType = MediaType::Common("audio/ogg");
    pub const MP4: MediaType = MediaType::Common("video/mp4");
    pub const WEBM: MediaType = MediaType::Common("video/webm");

    //
    // Font
    //
    pub const WOFF: MediaType = MediaType::Common("font/woff");
    pub const WOFF2: MediaType = MediaType::Common("font/woff2");

    /// Returns the media type for the given extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> &'static MediaType {
        MEDIA_TYPE_BY_EXTENSION.get(&UniCase::ascii(extension)).unwrap_or(&MediaType::OCTET_STREAM)
    }

    #[must_use]
    pub fn from_path(path: &str) -> &'static MediaType {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((_, extension)) => MediaType::from_extension(extension),
            None => &MediaType::OCTET_STREAM,
        }
    }
}

impl From<String> for MediaType {
    fn from(value: String) -> Self {
        MediaType::Custom(value)
    }
}

static MEDIA_TYPE_BY_EXTENSION: phf::Map<UniCase<&'static str>, MediaType> = phf_map!(
    UniCase::ascii("css") => MediaType::CASCADING_STYLE_SHEETS,
    UniCase::ascii("htm") => MediaType::HTML,
    UniCase::ascii("html") => MediaType::HTML,
    UniCase::ascii("js") => MediaType::JAVASCRIPT,
    UniCase::ascii("md") => MediaType::MARKDOWN,
    UniCase::ascii("txt") => MediaType::PLAIN_TEXT,

    UniCase::ascii("json") => MediaType::JSON,
    UniCase::ascii("pdf") => MediaType::PDF,
    UniCase::ascii("xml") => MediaType::XML,
    UniCase::ascii("zip") => MediaType::ZIP,

    UniCase::ascii("gif") => MediaType::GIF,
    UniCase::ascii("ico") => MediaType::ICO,
    UniCase::ascii("jpeg") => MediaType::JPEG,
    UniCase::ascii("jpg") => MediaType::JPEG,
    UniCase::ascii("png") => MediaType::PNG,
    UniCase::ascii("svg") => MediaType::SVG,
    UniCase::ascii("webp") => MediaType::WEBP,

    UniCase::ascii("mp3") => MediaType::MP3,
    UniCase::ascii("oga") => MediaType::OGG_AUDIO,
    UniCase::ascii("ogg") => MediaType::OGG_AUDIO,
    UniCase::ascii("mp4") => MediaType::MP4,
    UniCase::ascii("webm") => MediaType::WEBM,

    UniCase::ascii("woff") => MediaType::WOFF,
    UniCase::ascii("woff2") => MediaType::WOFF2,
);
