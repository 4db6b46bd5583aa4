//! Image optimization.
//!
//! Raster codecs are only compiled in with the `image` feature. Without it the
//! task still runs and copies raster files untouched, so a build that lacks the
//! codecs never blocks markup, styles or scripts.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use thiserror::Error;

use crate::config::ImageConfig;
use crate::error::SourceError;
use crate::pattern::SourceGlob;
use crate::reload::Reload;
use crate::task::{Outcome, TaskContext};

/// Errors that can occur when processing images.
#[derive(Debug, Error)]
pub enum ImageError {
    /// An I/O error occurred while reading or writing image files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The image glob could not be resolved.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// An error occurred during image decoding or encoding.
    #[cfg(feature = "image")]
    #[error("Image processing error in '{0}': {1}")]
    Image(Utf8PathBuf, image::ImageError),
}

/// How a file is treated, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Png,
    Jpeg,
    Svg,
    /// Copied untouched.
    Verbatim,
}

impl Kind {
    fn of(path: &Utf8Path) -> Self {
        match path.extension().map(str::to_ascii_lowercase).as_deref() {
            Some("png") => Kind::Png,
            Some("jpg" | "jpeg") => Kind::Jpeg,
            Some("svg") => Kind::Svg,
            _ => Kind::Verbatim,
        }
    }

    /// Part of the cache key, so changing settings invalidates old entries.
    fn settings(&self, config: &ImageConfig) -> String {
        match self {
            Kind::Png => "png-best-keep-color".into(),
            Kind::Jpeg => format!("jpeg-q{}-keep-color", config.jpeg_quality),
            Kind::Svg => "svg-min".into(),
            Kind::Verbatim => "copy".into(),
        }
    }
}

pub(super) fn optimize(ctx: &TaskContext) -> Result<Outcome, ImageError> {
    let config = ctx.config;
    let glob = SourceGlob::new(&config.root, &config.paths.src.images)?;
    let dist = config.resolve(&config.paths.dist.images);
    let cache = config.resolve(&config.images.cache_dir);

    #[cfg(not(feature = "image"))]
    tracing::warn!("built without the `image` feature, raster images are copied as-is");

    fs::create_dir_all(&cache)?;

    let written = glob
        .files()?
        .into_par_iter()
        .map(|file| -> Result<_, ImageError> {
            let target = dist.join(glob.relative(&file)?);
            process(&file, &target, &cache, &config.images)?;
            Ok(target)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Outcome {
        written,
        reload: Reload::None,
    })
}

fn process(
    file: &Utf8Path,
    target: &Utf8Path,
    cache: &Utf8Path,
    config: &ImageConfig,
) -> Result<(), ImageError> {
    let kind = Kind::of(file);
    let source = fs::read(file)?;

    if kind == Kind::Verbatim {
        crate::io::write(target, &source)?;
        return Ok(());
    }

    let hash = blake3::Hasher::new()
        .update(kind.settings(config).as_bytes())
        .update(&source)
        .finalize();

    let path_cache = cache.join(format!(
        "{}.{}",
        hash.to_hex(),
        file.extension().unwrap_or("bin")
    ));

    // FAST PATH: optimized earlier
    if path_cache.exists() {
        tracing::debug!("cache hit for {file}");
        crate::io::copy(&path_cache, target)?;
        return Ok(());
    }

    // SLOW PATH: encode and keep whichever is smaller
    let optimized = encode(kind, &source, config).map_err(|err| attach(err, file))?;
    let data = match optimized {
        Some(data) if data.len() < source.len() => data,
        _ => source,
    };

    crate::io::write(&path_cache, &data)?;
    crate::io::write(target, &data)?;

    Ok(())
}

#[cfg(feature = "image")]
type EncodeError = image::ImageError;

#[cfg(not(feature = "image"))]
type EncodeError = std::convert::Infallible;

#[cfg(feature = "image")]
fn attach(err: EncodeError, file: &Utf8Path) -> ImageError {
    ImageError::Image(file.to_owned(), err)
}

#[cfg(not(feature = "image"))]
fn attach(err: EncodeError, _: &Utf8Path) -> ImageError {
    match err {}
}

fn encode(kind: Kind, source: &[u8], config: &ImageConfig) -> Result<Option<Vec<u8>>, EncodeError> {
    match kind {
        Kind::Svg => Ok(std::str::from_utf8(source).ok().map(|svg| minify_svg(svg).into_bytes())),
        Kind::Png | Kind::Jpeg => raster(kind, source, config),
        Kind::Verbatim => Ok(None),
    }
}

/// Re-encode a raster image. Images carrying an orientation or color
/// profile are left alone, the encoders would drop that metadata.
#[cfg(feature = "image")]
fn raster(kind: Kind, source: &[u8], config: &ImageConfig) -> Result<Option<Vec<u8>>, EncodeError> {
    use std::io::Cursor;

    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};
    use image::metadata::Orientation;
    use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader};

    if kind == Kind::Png && has_color_chunks(source) {
        return Ok(None);
    }

    let mut decoder = ImageReader::new(Cursor::new(source))
        .with_guessed_format()?
        .into_decoder()?;

    if decoder.icc_profile()?.is_some() || decoder.orientation()? != Orientation::NoTransforms {
        return Ok(None);
    }

    let img = DynamicImage::from_decoder(decoder)?;
    let mut out = Vec::new();

    match kind {
        Kind::Png => {
            PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
                .write_image(img.as_bytes(), img.width(), img.height(), img.color().into())?;
        }
        Kind::Jpeg => {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut out, config.jpeg_quality).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        Kind::Svg | Kind::Verbatim => return Ok(None),
    }

    Ok(Some(out))
}

/// Whether a PNG has gamma, chromaticity, sRGB intent or ICC chunks.
#[cfg(feature = "image")]
fn has_color_chunks(png: &[u8]) -> bool {
    const SIGNATURE: usize = 8;
    const COLOR: [&[u8; 4]; 4] = [b"gAMA", b"cHRM", b"sRGB", b"iCCP"];

    let mut rest = png.get(SIGNATURE..).unwrap_or_default();

    // length, type, data, crc
    while let (Some(len), Some(kind)) = (rest.get(..4), rest.get(4..8)) {
        if COLOR.iter().any(|c| c.as_slice() == kind) {
            return true;
        }
        // ancillary chunks come before the image data
        if kind == b"IDAT" {
            return false;
        }

        let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
        rest = rest.get(12 + len..).unwrap_or_default();
    }

    false
}

#[cfg(not(feature = "image"))]
fn raster(_: Kind, _: &[u8], _: &ImageConfig) -> Result<Option<Vec<u8>>, EncodeError> {
    Ok(None)
}

/// Elements whose whitespace-only text is rendered.
const TEXT_ELEMENTS: [&str; 3] = ["text", "tspan", "textPath"];

/// Drop comments and the whitespace between tags. Whitespace inside text
/// elements and `xml:space="preserve"` subtrees is kept.
fn minify_svg(svg: &str) -> String {
    let svg = strip_comments(svg);
    let mut min = String::with_capacity(svg.len());
    // one flag per open element: keeps whitespace-only text
    let mut preserve: Vec<bool> = vec![];
    let mut rest = svg.as_str();

    while !rest.is_empty() {
        let (text, tail) = rest.split_at(rest.find('<').unwrap_or(rest.len()));
        let keep = preserve.last().copied().unwrap_or(false);
        if keep || !text.trim().is_empty() {
            min.push_str(text);
        }

        if tail.is_empty() {
            break;
        }

        let len = tag_len(tail);
        let tag = &tail[..len];
        min.push_str(tag);
        rest = &tail[len..];

        if tag.starts_with("</") {
            preserve.pop();
        } else if !(tag.starts_with("<?") || tag.starts_with("<!") || tag.ends_with("/>")) {
            let name = tag[1..]
                .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .next()
                .unwrap_or_default();
            let own = TEXT_ELEMENTS.contains(&name)
                || tag.contains(r#"xml:space="preserve""#)
                || tag.contains("xml:space='preserve'");
            preserve.push(keep || own);
        }
    }

    min.trim().to_string()
}

fn strip_comments(svg: &str) -> String {
    let mut out = String::with_capacity(svg.len());
    let mut rest = svg;

    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        rest = match rest[start..].find("-->") {
            Some(end) => &rest[start + end + 3..],
            None => "",
        };
    }
    out.push_str(rest);

    out
}

/// Length of the tag at the start of `s`, up to the first `>` outside quotes.
fn tag_len(s: &str) -> usize {
    let mut quote = None;

    for (i, c) in s.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if q == c => quote = None,
            (None, '>') => return i + 1,
            _ => {}
        }
    }

    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::tests::Fixture;

    const SVG: &str = r#"<?xml version="1.0"?>
<!-- exported by an editor -->
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
    <title>Gift   card</title>
    <rect width="10" height="10"/>
</svg>
"#;

    #[test]
    fn test_minify_svg() {
        assert_eq!(
            minify_svg(SVG),
            r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><title>Gift   card</title><rect width="10" height="10"/></svg>"#
        );
    }

    #[test]
    fn test_minify_svg_keeps_text_spacing() {
        let svg = "<svg>\n  <text><tspan>Gift</tspan> <tspan>card</tspan></text>\n</svg>";
        assert_eq!(
            minify_svg(svg),
            "<svg><text><tspan>Gift</tspan> <tspan>card</tspan></text></svg>"
        );

        let svg = r#"<svg> <g xml:space="preserve"> <rect/> </g> <circle r="1"/> </svg>"#;
        assert_eq!(
            minify_svg(svg),
            r#"<svg><g xml:space="preserve"> <rect/> </g><circle r="1"/></svg>"#
        );

        let svg = r#"<svg><text x="1>2"> </text> <a/></svg>"#;
        assert_eq!(minify_svg(svg), r#"<svg><text x="1>2"> </text><a/></svg>"#);
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(Kind::of(Utf8Path::new("a/b.PNG")), Kind::Png);
        assert_eq!(Kind::of(Utf8Path::new("a/b.jpeg")), Kind::Jpeg);
        assert_eq!(Kind::of(Utf8Path::new("a/b.svg")), Kind::Svg);
        assert_eq!(Kind::of(Utf8Path::new("a/b.webp")), Kind::Verbatim);
    }

    #[test]
    fn test_optimize_writes_into_dist_and_cache() {
        let fixture = Fixture::new();
        fixture.write("src/images/icons/gift.svg", SVG);
        fixture.write("src/images/banner.gif", b"GIF89a");

        let outcome = optimize(&fixture.ctx()).unwrap();

        assert_eq!(outcome.written.len(), 2);
        assert_eq!(fixture.read("dist/images/banner.gif"), "GIF89a");

        let svg = fixture.read("dist/images/icons/gift.svg");
        assert!(svg.len() < SVG.len());
        assert!(!svg.contains("exported"));

        let cached = fs::read_dir(fixture.root().join(".cache/images")).unwrap().count();
        assert_eq!(cached, 1);
    }

    #[test]
    fn test_cache_hit_reuses_output() {
        let fixture = Fixture::new();
        fixture.write("src/images/gift.svg", SVG);

        optimize(&fixture.ctx()).unwrap();
        fs::remove_file(fixture.root().join("dist/images/gift.svg")).unwrap();
        optimize(&fixture.ctx()).unwrap();

        assert_eq!(fixture.read("dist/images/gift.svg"), minify_svg(SVG));
    }

    #[cfg(feature = "image")]
    fn chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = (data.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        out.extend_from_slice(&[0; 4]);
        out
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_color_managed_png_is_kept() {
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend(chunk(b"IHDR", &[0; 13]));
        png.extend(chunk(b"gAMA", &45455u32.to_be_bytes()));
        png.extend(chunk(b"IDAT", &[0; 8]));
        png.extend(chunk(b"IEND", &[]));

        assert!(has_color_chunks(&png));

        let fixture = Fixture::new();
        fixture.write("src/images/photo.png", &png);
        optimize(&fixture.ctx()).unwrap();

        let out = fs::read(fixture.root().join("dist/images/photo.png")).unwrap();
        assert_eq!(out, png);
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_color_chunks_after_image_data_are_ignored() {
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend(chunk(b"IHDR", &[0; 13]));
        png.extend(chunk(b"IDAT", &[0; 8]));
        png.extend(chunk(b"gAMA", &[0; 4]));

        assert!(!has_color_chunks(&png));
        assert!(!has_color_chunks(b"short"));
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_png_is_reencoded() {
        use image::{ImageBuffer, Rgba};

        let fixture = Fixture::new();
        let img = ImageBuffer::from_pixel(32, 32, Rgba([200u8, 10, 10, 255]));
        let path = fixture.root().join("src/images/red.png");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        img.save(&path).unwrap();

        optimize(&fixture.ctx()).unwrap();

        let out = fs::read(fixture.root().join("dist/images/red.png")).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
        assert!(out.len() <= fs::metadata(&path).unwrap().len() as usize);
    }
}
