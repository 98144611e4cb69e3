//! Image source resolution: resource locator -> bytes -> natural size.
//!
//! The loader only depends on the [`ImageResolver`] trait, so embedders can
//! plug in their own fetch strategy (an asset cache, a sandboxed fetcher, a
//! test double). [`DefaultResolver`] understands `data:` URLs, `file://` URLs
//! and plain filesystem paths, and `http(s)://` URLs when the `http` feature
//! is enabled.

use crate::{Error, MemeConfig, NaturalSize, Result};
use base64::Engine as Base64Engine;
use std::io::Cursor;
use std::path::Path;

#[cfg(feature = "http")]
use reqwest::blocking::Client;
#[cfg(feature = "http")]
use std::time::Duration;

/// Resolves the natural pixel size of the image behind a resource locator.
///
/// Implementations may block; the loader always calls them off the caller's
/// thread.
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, source: &str) -> Result<NaturalSize>;
}

impl<F> ImageResolver for F
where
    F: Fn(&str) -> Result<NaturalSize> + Send + Sync,
{
    fn resolve(&self, source: &str) -> Result<NaturalSize> {
        self(source)
    }
}

/// Resolver used when the embedder does not supply one.
pub struct DefaultResolver {
    config: MemeConfig,
    #[cfg(feature = "http")]
    client: Client,
}

impl DefaultResolver {
    pub fn new(config: MemeConfig) -> Result<Self> {
        #[cfg(feature = "http")]
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            #[cfg(feature = "http")]
            client,
        })
    }

    /// Fetch the raw bytes behind `source`.
    pub fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        if source.starts_with("data:") {
            return decode_data_url(source);
        }

        match url::Url::parse(source) {
            // single-letter schemes are Windows drive letters
            Ok(parsed) if parsed.scheme().len() > 1 => match parsed.scheme() {
                "file" => {
                    let path = parsed
                        .to_file_path()
                        .map_err(|_| Error::LoadError(format!("Invalid file URL: {}", source)))?;
                    self.read_file(&path)
                }
                "http" | "https" => self.fetch_http(source),
                other => Err(Error::LoadError(format!("Unsupported URL scheme: {}", other))),
            },
            _ => self.read_file(Path::new(source)),
        }
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        if !self.config.allow_file_sources {
            return Err(Error::LoadError(format!(
                "File sources are disabled: {}",
                path.display()
            )));
        }
        std::fs::read(path)
            .map_err(|e| Error::LoadError(format!("Failed to read {}: {}", path.display(), e)))
    }

    #[cfg(feature = "http")]
    fn fetch_http(&self, source: &str) -> Result<Vec<u8>> {
        let mut req = self.client.get(source);
        for (name, value) in &self.config.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let res = req
            .send()
            .map_err(|e| Error::NetworkError(format!("HTTP GET failed: {}", e)))?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::LoadError(format!("HTTP {} for {}", status.as_u16(), source)));
        }

        let body = res
            .bytes()
            .map_err(|e| Error::NetworkError(format!("Failed to read response body: {}", e)))?;
        Ok(body.to_vec())
    }

    #[cfg(not(feature = "http"))]
    fn fetch_http(&self, source: &str) -> Result<Vec<u8>> {
        Err(Error::LoadError(format!(
            "Remote sources require the `http` feature: {}",
            source
        )))
    }
}

impl ImageResolver for DefaultResolver {
    fn resolve(&self, source: &str) -> Result<NaturalSize> {
        let bytes = self.fetch(source)?;
        probe_dimensions(&bytes)
    }
}

/// Read the intrinsic dimensions from encoded image bytes without decoding
/// the pixel data.
pub fn probe_dimensions(bytes: &[u8]) -> Result<NaturalSize> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::DecodeError(e.to_string()))?;
    if reader.format().is_none() {
        return Err(Error::DecodeError("Unrecognized image format".to_string()));
    }

    let (width, height) = reader.into_dimensions()?;
    if width == 0 || height == 0 {
        return Err(Error::DecodeError(format!(
            "Image has no area: {}x{}",
            width, height
        )));
    }
    Ok(NaturalSize { width, height })
}

/// Decode the payload of a `data:` URL (RFC 2397).
pub fn decode_data_url(source: &str) -> Result<Vec<u8>> {
    let rest = source
        .strip_prefix("data:")
        .ok_or_else(|| Error::LoadError("Not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::LoadError("Malformed data URL: missing ','".to_string()))?;

    // parameters after the media type are case-insensitive; `base64` may sit anywhere
    let is_base64 = header
        .split(';')
        .skip(1)
        .any(|param| param.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| Error::LoadError(format!("Invalid base64 in data URL: {}", e)))
    } else {
        percent_decode(payload)
    }
}

fn percent_decode(input: &str) -> Result<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::LoadError("Invalid percent escape in data URL".to_string()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent GIF
    const GIF_1X1: &str = "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::new(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn probe_reads_png_dimensions() {
        let size = probe_dimensions(&png_bytes(40, 25)).unwrap();
        assert_eq!(size, NaturalSize { width: 40, height: 25 });
    }

    #[test]
    fn probe_rejects_garbage() {
        let err = probe_dimensions(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::DecodeError(_)));
    }

    #[test]
    fn base64_data_url_resolves() {
        let resolver = DefaultResolver::new(MemeConfig::default()).unwrap();
        let src = format!("data:image/gif;base64,{}", GIF_1X1);
        assert_eq!(resolver.resolve(&src).unwrap(), NaturalSize { width: 1, height: 1 });
    }

    #[test]
    fn base64_marker_is_case_insensitive() {
        let resolver = DefaultResolver::new(MemeConfig::default()).unwrap();
        let upper = format!("data:image/gif;BASE64,{}", GIF_1X1);
        assert_eq!(resolver.resolve(&upper).unwrap(), NaturalSize { width: 1, height: 1 });

        let with_param = format!("data:image/gif; Base64 ;name=cat.gif,{}", GIF_1X1);
        assert_eq!(resolver.resolve(&with_param).unwrap(), NaturalSize { width: 1, height: 1 });
    }

    #[test]
    fn base64_media_type_is_not_a_marker() {
        // "base64" as the media type itself is not the encoding flag
        assert_eq!(decode_data_url("data:base64,abc").unwrap(), b"abc".to_vec());
    }

    #[test]
    fn percent_encoded_data_url_decodes() {
        assert_eq!(decode_data_url("data:,a%20b%2C").unwrap(), b"a b,".to_vec());
    }

    #[test]
    fn malformed_data_url_is_a_load_error() {
        assert!(matches!(decode_data_url("data:image/png;base64"), Err(Error::LoadError(_))));
        assert!(matches!(decode_data_url("data:,%zz"), Err(Error::LoadError(_))));
    }

    #[test]
    fn file_path_and_file_url_resolve() {
        let dir = std::env::temp_dir().join(format!("meme-svg-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("wide.png");
        std::fs::write(&path, png_bytes(64, 16)).unwrap();

        let resolver = DefaultResolver::new(MemeConfig::default()).unwrap();
        let expected = NaturalSize { width: 64, height: 16 };
        assert_eq!(resolver.resolve(path.to_str().unwrap()).unwrap(), expected);

        let file_url = url::Url::from_file_path(&path).unwrap();
        assert_eq!(resolver.resolve(file_url.as_str()).unwrap(), expected);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_sources_can_be_disabled() {
        let cfg = MemeConfig {
            allow_file_sources: false,
            ..Default::default()
        };
        let resolver = DefaultResolver::new(cfg).unwrap();
        assert!(matches!(resolver.resolve("/tmp/whatever.png"), Err(Error::LoadError(_))));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let resolver = DefaultResolver::new(MemeConfig::default()).unwrap();
        let err = resolver.resolve("ftp://example.com/cat.png").unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }

    #[test]
    fn closures_are_resolvers() {
        let r = |_: &str| -> Result<NaturalSize> { Ok(NaturalSize { width: 3, height: 2 }) };
        assert_eq!(ImageResolver::resolve(&r, "x").unwrap().width, 3);
    }
}
