//! Video embed classification and synthesis, plus data URIs for local files.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{EditorError, ValidationError};
use crate::markup::escape_attr;

const DIRECT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg"];

/// How a video URL will be embedded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class", content = "value", rename_all = "snake_case")]
pub enum EmbedClass {
    YouTube(String),
    Vimeo(String),
    DirectFile(String),
    Generic,
}

/// A ready-to-render video player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "player", rename_all = "snake_case")]
pub enum MediaEmbed {
    /// A third-party player page shown in an inline frame.
    Frame { src: String },
    /// A native video element over a direct source.
    Video { src: String, mime: String },
}

impl MediaEmbed {
    pub fn src(&self) -> &str {
        match self {
            Self::Frame { src } | Self::Video { src, .. } => src,
        }
    }

    /// Player markup inside a `video-embed` wrapper. Frames keep a 16:9 box.
    pub fn to_markup(&self) -> String {
        match self {
            Self::Frame { src } => format!(
                concat!(
                    r#"<div class="video-embed" style="position: relative; padding-bottom: 56.25%; height: 0; overflow: hidden;">"#,
                    r#"<iframe src="{}" style="position: absolute; top: 0; left: 0; width: 100%; height: 100%;" frameborder="0" allowfullscreen=""></iframe>"#,
                    "</div>"
                ),
                escape_attr(src)
            ),
            Self::Video { src, mime } => format!(
                concat!(
                    r#"<div class="video-embed"><video controls="" style="width: 100%;">"#,
                    r#"<source src="{}" type="{}"></video></div>"#
                ),
                escape_attr(src),
                escape_attr(mime)
            ),
        }
    }
}

pub fn classify(url: &str) -> EmbedClass {
    let url = url.trim();
    if let Some(id) = youtube_id(url) {
        return EmbedClass::YouTube(id);
    }
    if let Some(id) = vimeo_id(url) {
        return EmbedClass::Vimeo(id);
    }
    if let Some(ext) = direct_extension(url) {
        return EmbedClass::DirectFile(ext);
    }
    EmbedClass::Generic
}

fn youtube_id(url: &str) -> Option<String> {
    for marker in ["youtu.be/", "youtube.com/watch?v=", "youtube.com/embed/"] {
        if let Some(ix) = url.find(marker) {
            let id = take_until(&url[ix + marker.len()..], &['?', '&', '#', '/']);
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }

    if url.contains("youtube.com/watch") {
        let parsed = Url::parse(url).ok()?;
        return parsed
            .query_pairs()
            .find(|(key, value)| key == "v" && !value.is_empty())
            .map(|(_, value)| value.into_owned());
    }
    None
}

fn vimeo_id(url: &str) -> Option<String> {
    let ix = url.find("vimeo.com/")?;
    let rest = take_until(&url[ix + "vimeo.com/".len()..], &['?', '#']);
    rest.split('/')
        .find(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
}

fn direct_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => take_until(url, &['?', '#']).to_string(),
    };
    let file = path.rsplit('/').next().unwrap_or_default();
    let (_, ext) = file.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    DIRECT_VIDEO_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

fn take_until<'a>(input: &'a str, stops: &[char]) -> &'a str {
    match input.find(stops) {
        Some(end) => &input[..end],
        None => input,
    }
}

/// Checks a user-supplied video URL. Input without a scheme is read as https.
pub fn validate_video_url(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidUrl(input.to_string()));
    }

    let candidate = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{trimmed}"))
            .map_err(|_| ValidationError::InvalidUrl(input.to_string()))?,
        Err(_) => return Err(ValidationError::InvalidUrl(input.to_string())),
    };

    match candidate.scheme() {
        "http" | "https" if candidate.host_str().is_some_and(|host| !host.is_empty()) => {
            Ok(candidate.to_string())
        }
        _ => Err(ValidationError::InvalidUrl(input.to_string())),
    }
}

pub fn synthesize(url: &str, class: &EmbedClass) -> MediaEmbed {
    match class {
        EmbedClass::YouTube(id) => MediaEmbed::Frame {
            src: format!("https://www.youtube.com/embed/{id}"),
        },
        EmbedClass::Vimeo(id) => MediaEmbed::Frame {
            src: format!("https://player.vimeo.com/video/{id}"),
        },
        EmbedClass::DirectFile(ext) => MediaEmbed::Video {
            src: url.to_string(),
            mime: format!("video/{ext}"),
        },
        EmbedClass::Generic => MediaEmbed::Frame {
            src: url.to_string(),
        },
    }
}

pub(crate) fn video_mime_for(src: &str) -> String {
    match direct_extension(src) {
        Some(ext) => format!("video/{ext}"),
        None => "video/mp4".to_string(),
    }
}

/// A file picked by the user, already read into memory by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// The declared MIME type, else one guessed from the file extension.
    pub fn mime_type(&self) -> String {
        if let Some(mime) = self.mime.as_deref().filter(|mime| !mime.trim().is_empty()) {
            return mime.to_string();
        }
        let ext = self
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let mime = match ext.as_str() {
            "mp4" | "m4v" => "video/mp4",
            "webm" => "video/webm",
            "ogg" | "ogv" => "video/ogg",
            "mov" => "video/quicktime",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        };
        mime.to_string()
    }
}

/// Encodes `file` as a base64 data URI, refusing files larger than `limit`.
pub fn data_uri(file: &LocalFile, limit: u64) -> Result<String, EditorError> {
    if file.size() > limit {
        return Err(EditorError::SizeLimitExceeded {
            size: file.size(),
            limit,
        });
    }
    Ok(format!(
        "data:{};base64,{}",
        file.mime_type(),
        STANDARD.encode(&file.bytes)
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum VideoInput {
    Url { url: String },
    File { file: LocalFile },
}

/// Turns a URL or a local file into an embed without touching any document.
pub fn resolve_video(input: &VideoInput, limit: u64) -> Result<MediaEmbed, EditorError> {
    match input {
        VideoInput::Url { url } => {
            let url = validate_video_url(url)?;
            let class = classify(&url);
            tracing::debug!(?class, "classified video url");
            Ok(synthesize(&url, &class))
        }
        VideoInput::File { file } => Ok(MediaEmbed::Video {
            src: data_uri(file, limit)?,
            mime: file.mime_type(),
        }),
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
