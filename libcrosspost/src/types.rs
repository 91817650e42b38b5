//! Core types for Crosspost

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CrosspostError, PlatformError, Result};

/// The platforms Crosspost publishes to, in publishing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Mastodon,
    Twitter,
    Bluesky,
}

impl PlatformKind {
    /// All platforms in the fixed publishing order
    pub const ALL: [PlatformKind; 3] = [
        PlatformKind::Mastodon,
        PlatformKind::Twitter,
        PlatformKind::Bluesky,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Mastodon => "mastodon",
            PlatformKind::Twitter => "twitter",
            PlatformKind::Bluesky => "bluesky",
        }
    }

    /// Human-facing name used in progress output
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformKind::Mastodon => "Mastodon",
            PlatformKind::Twitter => "Twitter",
            PlatformKind::Bluesky => "Bluesky",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON input document
///
/// ```json
/// {
///   "post": "Release day!",
///   "bluesky_mentions": "@alice.bsky.social"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostPayload {
    pub post: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastodon_mentions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_mentions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bluesky_mentions: Option<String>,
}

/// A post loaded from input, shared read-only by every publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    base_text: String,
    suffixes: BTreeMap<PlatformKind, String>,
    image_paths: Vec<PathBuf>,
}

impl Post {
    pub fn new(base_text: impl Into<String>) -> Self {
        Self {
            base_text: base_text.into(),
            suffixes: BTreeMap::new(),
            image_paths: Vec::new(),
        }
    }

    pub fn with_suffix(mut self, platform: PlatformKind, suffix: impl Into<String>) -> Self {
        self.suffixes.insert(platform, suffix.into());
        self
    }

    pub fn with_images(mut self, image_paths: Vec<PathBuf>) -> Self {
        self.image_paths = image_paths;
        self
    }

    /// Build a post from a parsed payload and the images given on the command line
    pub fn from_payload(payload: PostPayload, image_paths: Vec<PathBuf>) -> Self {
        let mut post = Post::new(payload.post).with_images(image_paths);
        let suffixes = [
            (PlatformKind::Mastodon, payload.mastodon_mentions),
            (PlatformKind::Twitter, payload.twitter_mentions),
            (PlatformKind::Bluesky, payload.bluesky_mentions),
        ];
        for (platform, suffix) in suffixes {
            if let Some(suffix) = suffix {
                post = post.with_suffix(platform, suffix);
            }
        }
        post
    }

    /// Load a post from an input file.
    ///
    /// `.txt` files are taken verbatim as the base text; anything else must be
    /// a JSON [`PostPayload`].
    pub fn load(path: &Path, image_paths: Vec<PathBuf>) -> Result<Self> {
        if !path.exists() {
            return Err(CrosspostError::InvalidInput(format!(
                "The specified input file does not exist: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CrosspostError::InvalidInput(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));

        let payload = if is_text {
            PostPayload {
                post: content,
                ..Default::default()
            }
        } else {
            serde_json::from_str::<PostPayload>(&content).map_err(|e| {
                CrosspostError::InvalidInput(format!(
                    "Failed to parse {} as a post payload: {}",
                    path.display(),
                    e
                ))
            })?
        };

        if payload.post.trim().is_empty() {
            return Err(CrosspostError::InvalidInput(
                "Post content cannot be empty".to_string(),
            ));
        }

        Ok(Self::from_payload(payload, image_paths))
    }

    pub fn suffix(&self, platform: PlatformKind) -> Option<&str> {
        self.suffixes.get(&platform).map(String::as_str)
    }

    pub fn image_paths(&self) -> &[PathBuf] {
        &self.image_paths
    }

    /// The text variant for one platform: trimmed base text, plus the trimmed
    /// suffix on its own line when there is one.
    pub fn text_for(&self, platform: PlatformKind) -> String {
        let base = self.base_text.trim();
        match self.suffix(platform).map(str::trim) {
            Some(suffix) if !suffix.is_empty() => format!("{}\n{}", base, suffix),
            _ => base.to_string(),
        }
    }
}

/// Check that every image path exists, listing all the missing ones.
pub fn validate_image_paths(image_paths: &[PathBuf]) -> Result<()> {
    let missing: Vec<String> = image_paths
        .iter()
        .filter(|path| !path.exists())
        .map(|path| path.display().to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CrosspostError::InvalidInput(format!(
            "The following image files do not exist: {}",
            missing.join(", ")
        )))
    }
}

/// Outcome of publishing to one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub platform: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishResult {
    pub fn success(platform: &str, post_id: String) -> Self {
        Self {
            platform: platform.to_string(),
            ok: true,
            post_id: Some(post_id),
            error: None,
        }
    }

    pub fn failure(platform: &str, error: impl fmt::Display) -> Self {
        Self {
            platform: platform.to_string(),
            ok: false,
            post_id: None,
            error: Some(error.to_string()),
        }
    }
}

// ============================================================================
// Attachment Types
// ============================================================================

/// Supported image MIME types for attachments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Detect MIME type from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Get the MIME type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }
}

impl fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image on disk, inspected before upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub mime_type: Option<ImageMimeType>,
    pub size: u64,
}

impl MediaFile {
    /// Stat the file and detect its MIME type from the extension
    pub fn inspect(path: &Path) -> std::result::Result<Self, PlatformError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            PlatformError::Upload(format!("Cannot read image {}: {}", path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(PlatformError::Upload(format!(
                "Image path is not a file: {}",
                path.display()
            )));
        }

        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageMimeType::from_extension);

        Ok(Self {
            path: path.to_path_buf(),
            mime_type,
            size: metadata.len(),
        })
    }

    /// MIME string sent to platforms that need one
    pub fn mime_str(&self) -> &'static str {
        self.mime_type
            .map(|m| m.as_str())
            .unwrap_or("application/octet-stream")
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string())
    }

    pub async fn read(&self) -> std::result::Result<Vec<u8>, PlatformError> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            PlatformError::Upload(format!("Failed to read image {}: {}", self.path.display(), e))
        })
    }
}

/// Opaque reference to an uploaded image, passed back when posting
#[derive(Debug, Clone, PartialEq)]
pub enum MediaHandle {
    /// Media id string (Mastodon, Twitter)
    Id(String),
    /// Blob reference object (Bluesky)
    Blob(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_platform_kind_order_and_names() {
        assert_eq!(
            PlatformKind::ALL.map(|p| p.as_str()),
            ["mastodon", "twitter", "bluesky"]
        );
        assert_eq!(PlatformKind::Bluesky.display_name(), "Bluesky");
        assert_eq!(PlatformKind::Twitter.to_string(), "twitter");
    }

    #[test]
    fn test_text_for_joins_suffix_on_new_line() {
        let post = Post::new("  Hello world \n").with_suffix(PlatformKind::Bluesky, " @alice.bsky.social ");
        assert_eq!(post.text_for(PlatformKind::Bluesky), "Hello world\n@alice.bsky.social");
    }

    #[test]
    fn test_text_for_without_suffix() {
        let post = Post::new("Hello world\n");
        assert_eq!(post.text_for(PlatformKind::Mastodon), "Hello world");
    }

    #[test]
    fn test_text_for_blank_suffix_is_ignored() {
        let post = Post::new("Hello").with_suffix(PlatformKind::Twitter, "   ");
        assert_eq!(post.text_for(PlatformKind::Twitter), "Hello");
    }

    #[test]
    fn test_from_payload_maps_platform_suffixes() {
        let payload = PostPayload {
            post: "Launch".to_string(),
            mastodon_mentions: Some("@bob@mastodon.social".to_string()),
            twitter_mentions: Some("@bob".to_string()),
            bluesky_mentions: None,
        };
        let post = Post::from_payload(payload, vec![PathBuf::from("a.png")]);

        assert_eq!(post.text_for(PlatformKind::Mastodon), "Launch\n@bob@mastodon.social");
        assert_eq!(post.text_for(PlatformKind::Twitter), "Launch\n@bob");
        assert_eq!(post.text_for(PlatformKind::Bluesky), "Launch");
        assert_eq!(post.image_paths(), &[PathBuf::from("a.png")]);
    }

    #[test]
    fn test_load_json_payload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("post.json");
        fs::write(
            &path,
            r#"{"post": "Hello", "bluesky_mentions": "@alice.bsky.social"}"#,
        )
        .unwrap();

        let post = Post::load(&path, Vec::new()).unwrap();
        assert_eq!(post.text_for(PlatformKind::Mastodon), "Hello");
        assert_eq!(post.suffix(PlatformKind::Bluesky), Some("@alice.bsky.social"));
        assert_eq!(post.suffix(PlatformKind::Mastodon), None);
    }

    #[test]
    fn test_load_plain_text_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("post.txt");
        fs::write(&path, "Just some text\n").unwrap();

        let post = Post::load(&path, Vec::new()).unwrap();
        assert_eq!(post.text_for(PlatformKind::Twitter), "Just some text");
    }

    #[test]
    fn test_load_missing_file_is_invalid_input() {
        let result = Post::load(Path::new("/nonexistent/post.json"), Vec::new());
        match result {
            Err(CrosspostError::InvalidInput(msg)) => assert!(msg.contains("does not exist")),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_missing_post_field() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("post.json");
        fs::write(&path, r#"{"twitter_mentions": "@bob"}"#).unwrap();

        let result = Post::load(&path, Vec::new());
        assert!(matches!(result, Err(CrosspostError::InvalidInput(_))));
    }

    #[test]
    fn test_load_rejects_blank_post() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("post.json");
        fs::write(&path, r#"{"post": "   "}"#).unwrap();

        match Post::load(&path, Vec::new()) {
            Err(CrosspostError::InvalidInput(msg)) => assert!(msg.contains("cannot be empty")),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_image_paths_lists_every_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("present.png");
        fs::write(&present, b"png").unwrap();

        assert!(validate_image_paths(&[present.clone()]).is_ok());

        let result = validate_image_paths(&[
            present,
            PathBuf::from("/nonexistent/one.png"),
            PathBuf::from("/nonexistent/two.jpg"),
        ]);
        match result {
            Err(CrosspostError::InvalidInput(msg)) => {
                assert!(msg.contains("one.png"));
                assert!(msg.contains("two.jpg"));
                assert!(!msg.contains("present.png"));
            }
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_publish_result_constructors() {
        let ok = PublishResult::success("mastodon", "123".to_string());
        assert!(ok.ok);
        assert_eq!(ok.post_id.as_deref(), Some("123"));
        assert_eq!(ok.error, None);

        let failed = PublishResult::failure("twitter", PlatformError::Upload("boom".into()));
        assert!(!failed.ok);
        assert_eq!(failed.error.as_deref(), Some("Upload failed: boom"));
    }

    #[test]
    fn test_publish_result_serialization_skips_empty_fields() {
        let ok = PublishResult::success("bluesky", "at://did:plc:1/app.bsky.feed.post/1".into());
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["platform"], "bluesky");
        assert_eq!(json["ok"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_image_mime_type_from_extension() {
        assert_eq!(ImageMimeType::from_extension("JPG"), Some(ImageMimeType::Jpeg));
        assert_eq!(ImageMimeType::from_extension("jpeg"), Some(ImageMimeType::Jpeg));
        assert_eq!(ImageMimeType::from_extension("png"), Some(ImageMimeType::Png));
        assert_eq!(ImageMimeType::from_extension("gif"), Some(ImageMimeType::Gif));
        assert_eq!(ImageMimeType::from_extension("WebP"), Some(ImageMimeType::WebP));
        assert_eq!(ImageMimeType::from_extension("txt"), None);
        assert_eq!(ImageMimeType::from_extension(""), None);
    }

    #[test]
    fn test_media_file_inspect() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.PNG");
        fs::write(&path, [0u8; 42]).unwrap();

        let media = MediaFile::inspect(&path).unwrap();
        assert_eq!(media.size, 42);
        assert_eq!(media.mime_type, Some(ImageMimeType::Png));
        assert_eq!(media.mime_str(), "image/png");
        assert_eq!(media.file_name(), "photo.PNG");
    }

    #[test]
    fn test_media_file_unknown_extension_falls_back_to_octet_stream() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.heic");
        fs::write(&path, b"data").unwrap();

        let media = MediaFile::inspect(&path).unwrap();
        assert_eq!(media.mime_type, None);
        assert_eq!(media.mime_str(), "application/octet-stream");
    }

    #[test]
    fn test_media_file_inspect_missing_is_upload_error() {
        let result = MediaFile::inspect(Path::new("/nonexistent/photo.png"));
        assert!(matches!(result, Err(PlatformError::Upload(_))));
    }

    #[tokio::test]
    async fn test_media_file_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.gif");
        fs::write(&path, b"GIF89a").unwrap();

        let media = MediaFile::inspect(&path).unwrap();
        assert_eq!(media.read().await.unwrap(), b"GIF89a".to_vec());
    }
}
