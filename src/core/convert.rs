use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgba, RgbaImage, imageops};
use thiserror::Error;

use super::settings::Settings;

/// Target formats offered by the converter. The output extension is the
/// format token itself, so `jpeg` and `jpg` (and `jfif`) are distinct
/// entries even though they share an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Jpg,
    Webp,
    Jfif,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Webp => "webp",
            OutputFormat::Jfif => "jfif",
        }
    }

    fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg | OutputFormat::Jpg | OutputFormat::Jfif => image::ImageFormat::Jpeg,
            OutputFormat::Webp => image::ImageFormat::WebP,
        }
    }

    fn is_jpeg(&self) -> bool {
        matches!(self, OutputFormat::Jpeg | OutputFormat::Jpg | OutputFormat::Jfif)
    }

    pub fn all() -> [OutputFormat; 5] {
        [
            OutputFormat::Png,
            OutputFormat::Jpeg,
            OutputFormat::Jpg,
            OutputFormat::Webp,
            OutputFormat::Jfif,
        ]
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to create output folder {}: {source}", .path.display())]
    CreateFolder { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to open image {}: {source}", .path.display())]
    Decode { path: PathBuf, #[source] source: image::ImageError },

    #[error("failed to write {}: {source}", .path.display())]
    Encode { path: PathBuf, #[source] source: image::ImageError },

    #[error("input file has no usable name: {}", .0.display())]
    InvalidFileName(PathBuf),
}

/// Result of a conversion request.
#[derive(Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The selection was empty; nothing was written.
    NothingSelected,
    Converted { count: usize, output_dir: PathBuf },
}

/// Converts every file in `files` to `format`, writing into a directory
/// chosen by the output policy. `folder_label` names any created folder
/// (the localized "converted" string). The first failure aborts the batch;
/// files written before it are left in place.
pub fn convert_batch(
    files: &[PathBuf],
    format: OutputFormat,
    settings: &Settings,
    folder_label: &str,
) -> Result<BatchOutcome, ConvertError> {
    if files.is_empty() {
        return Ok(BatchOutcome::NothingSelected);
    }

    let output_dir = resolve_output_dir(files, settings, folder_label)?;

    for file in files {
        let written = convert_file(file, &output_dir, format)?;
        log::debug!("converted {} -> {}", file.display(), written.display());
    }

    log::info!("converted {} file(s) into {}", files.len(), output_dir.display());
    Ok(BatchOutcome::Converted { count: files.len(), output_dir })
}

/// Output-directory policy: a fresh `<label>_<timestamp>` folder when the
/// user always wants one or more than one file is being converted,
/// otherwise the save location itself. An empty save location means the
/// directory of the first input file.
fn resolve_output_dir(
    files: &[PathBuf],
    settings: &Settings,
    folder_label: &str,
) -> Result<PathBuf, ConvertError> {
    let base = if settings.save_location.is_empty() {
        files[0].parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        PathBuf::from(&settings.save_location)
    };

    if settings.always_create_folder || files.len() > 1 {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let dir = base.join(format!("{folder_label}_{timestamp}"));
        fs::create_dir_all(&dir)
            .map_err(|source| ConvertError::CreateFolder { path: dir.clone(), source })?;
        Ok(dir)
    } else {
        Ok(base)
    }
}

fn convert_file(
    input: &Path,
    output_dir: &Path,
    format: OutputFormat,
) -> Result<PathBuf, ConvertError> {
    let img = image::open(input)
        .map_err(|source| ConvertError::Decode { path: input.to_path_buf(), source })?;

    // JPEG has no alpha channel: composite onto opaque white first.
    let img = if format.is_jpeg() && img.color().has_alpha() {
        flatten_onto_white(&img)
    } else {
        img
    };

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConvertError::InvalidFileName(input.to_path_buf()))?;
    let output_path = output_dir.join(format!("{stem}.{}", format.extension()));

    img.save_with_format(&output_path, format.image_format())
        .map_err(|source| ConvertError::Encode { path: output_path.clone(), source })?;

    Ok(output_path)
}

fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

    fn work_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "imgconv_convert_{}_{}_{}",
            name,
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed),
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_rgb_png(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(8, 6, image::Rgb(color)).save(&path).unwrap();
        path
    }

    fn write_transparent_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(8, 6, Rgba([0, 0, 0, 0])).save(&path).unwrap();
        path
    }

    fn settings(save_location: &Path, always_create_folder: bool) -> Settings {
        Settings {
            save_location: save_location.display().to_string(),
            language: "en".to_string(),
            always_create_folder,
        }
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> =
            fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
        entries.sort();
        entries
    }

    #[test]
    fn empty_selection_writes_nothing() {
        let out = work_dir("empty_out");
        let outcome =
            convert_batch(&[], OutputFormat::Png, &settings(&out, true), "converted").unwrap();
        assert_eq!(outcome, BatchOutcome::NothingSelected);
        assert!(entries(&out).is_empty());
    }

    #[test]
    fn single_file_lands_directly_in_save_location() {
        let src = work_dir("single_src");
        let out = work_dir("single_out");
        let input = write_rgb_png(&src, "photo.png", [10, 200, 30]);

        let outcome = convert_batch(
            &[input],
            OutputFormat::Webp,
            &settings(&out, false),
            "converted",
        )
        .unwrap();

        assert_eq!(outcome, BatchOutcome::Converted { count: 1, output_dir: out.clone() });
        assert_eq!(entries(&out), vec![out.join("photo.webp")]);
    }

    #[test]
    fn single_file_with_empty_save_location_uses_input_directory() {
        let src = work_dir("single_cwd");
        let input = write_rgb_png(&src, "photo.png", [10, 200, 30]);

        let mut cfg = settings(&src, false);
        cfg.save_location.clear();
        let outcome = convert_batch(&[input], OutputFormat::Jpg, &cfg, "converted").unwrap();

        assert_eq!(outcome, BatchOutcome::Converted { count: 1, output_dir: src.clone() });
        assert!(src.join("photo.jpg").is_file());
    }

    #[test]
    fn multiple_files_share_one_new_folder() {
        let src = work_dir("multi_src");
        let out = work_dir("multi_out");
        let a = write_rgb_png(&src, "a.png", [255, 0, 0]);
        let b = write_rgb_png(&src, "b.png", [0, 0, 255]);

        let outcome =
            convert_batch(&[a, b], OutputFormat::Jpeg, &settings(&out, false), "converted")
                .unwrap();

        let BatchOutcome::Converted { count, output_dir } = outcome else {
            panic!("expected converted outcome");
        };
        assert_eq!(count, 2);
        assert_eq!(output_dir.parent(), Some(out.as_path()));
        let name = output_dir.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("converted_"), "{name}");

        // Exactly one new folder holding both outputs.
        assert_eq!(entries(&out), vec![output_dir.clone()]);
        assert_eq!(
            entries(&output_dir),
            vec![output_dir.join("a.jpeg"), output_dir.join("b.jpeg")]
        );
    }

    #[test]
    fn folder_flag_forces_folder_for_single_file() {
        let src = work_dir("flag_src");
        let out = work_dir("flag_out");
        let input = write_rgb_png(&src, "photo.png", [1, 2, 3]);

        let outcome =
            convert_batch(&[input], OutputFormat::Png, &settings(&out, true), "converted")
                .unwrap();

        let BatchOutcome::Converted { output_dir, .. } = outcome else {
            panic!("expected converted outcome");
        };
        assert_ne!(output_dir, out);
        assert!(output_dir.join("photo.png").is_file());
    }

    #[test]
    fn alpha_flattens_to_white_for_jpeg() {
        let src = work_dir("alpha_src");
        let out = work_dir("alpha_out");
        let input = write_transparent_png(&src, "ghost.png");

        convert_batch(&[input], OutputFormat::Jpeg, &settings(&out, false), "converted").unwrap();

        let result = image::open(out.join("ghost.jpeg")).unwrap();
        assert!(!result.color().has_alpha());
        assert_eq!((result.width(), result.height()), (8, 6));
        for pixel in result.to_rgb8().pixels() {
            // JPEG is lossy; a fully transparent source must still come out
            // effectively white.
            assert!(pixel.0.iter().all(|&c| c > 250), "pixel {:?}", pixel.0);
        }
    }

    #[test]
    fn alpha_survives_png_to_webp() {
        let src = work_dir("keep_alpha_src");
        let out = work_dir("keep_alpha_out");
        let path = src.join("half.png");
        RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128])).save(&path).unwrap();

        convert_batch(&[path], OutputFormat::Webp, &settings(&out, false), "converted").unwrap();

        let result = image::open(out.join("half.webp")).unwrap();
        assert!(result.color().has_alpha());
        assert_eq!(result.to_rgba8().get_pixel(0, 0).0, [255, 0, 0, 128]);
    }

    #[test]
    fn png_roundtrip_is_lossless() {
        let src = work_dir("lossless_src");
        let out = work_dir("lossless_out");
        let input = write_rgb_png(&src, "exact.png", [12, 34, 56]);
        let original = image::open(&input).unwrap().to_rgb8();

        convert_batch(&[input], OutputFormat::Png, &settings(&out, false), "converted").unwrap();

        let result = image::open(out.join("exact.png")).unwrap().to_rgb8();
        assert_eq!(original.as_raw(), result.as_raw());
    }

    #[test]
    fn jfif_output_uses_jfif_extension() {
        let src = work_dir("jfif_src");
        let out = work_dir("jfif_out");
        let input = write_rgb_png(&src, "photo.png", [90, 90, 90]);

        convert_batch(&[input], OutputFormat::Jfif, &settings(&out, false), "converted").unwrap();

        assert!(out.join("photo.jfif").is_file());
        // The bytes are JPEG regardless of the extension.
        let decoded = image::ImageReader::open(out.join("photo.jfif"))
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn unreadable_file_aborts_but_keeps_earlier_outputs() {
        let src = work_dir("abort_src");
        let out = work_dir("abort_out");
        let good = write_rgb_png(&src, "good.png", [7, 7, 7]);
        let bad = src.join("bad.png");
        fs::write(&bad, b"not an image").unwrap();

        let err = convert_batch(
            &[good, bad],
            OutputFormat::Png,
            &settings(&out, false),
            "converted",
        )
        .unwrap_err();

        assert!(matches!(err, ConvertError::Decode { .. }));
        let folders = entries(&out);
        assert_eq!(folders.len(), 1);
        assert_eq!(entries(&folders[0]), vec![folders[0].join("good.png")]);
    }

    #[test]
    fn folder_creation_failure_is_reported() {
        let src = work_dir("badbase_src");
        let input = write_rgb_png(&src, "photo.png", [1, 1, 1]);

        // A regular file where the base directory should be.
        let base = work_dir("badbase_out").join("blocker");
        fs::write(&base, b"file, not a directory").unwrap();

        let err = convert_batch(&[input], OutputFormat::Png, &settings(&base, true), "converted")
            .unwrap_err();
        assert!(matches!(err, ConvertError::CreateFolder { .. }));
    }
}
