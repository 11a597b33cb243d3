//! Inspection of saved images.
//!
//! Unpacks the archive written by `docker save` and applies its layers in
//! order onto a directory, yielding the image's merged filesystem. Used to
//! verify that a composed image carries the app tree at the app path.

use std::io::Read;
use std::path::{Path, PathBuf};

use runa_common::error::{Result, RunaError};
use runa_common::types::Sha256Hash;
use serde::Deserialize;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const SAVED_MANIFEST: &str = "manifest.json";

/// A single filesystem layer in an image.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Content-addressed hash of the layer archive.
    pub hash: Sha256Hash,
    /// Size of the layer archive in bytes.
    pub size_bytes: u64,
}

/// One image entry of a `docker save` `manifest.json`.
#[derive(Debug, Deserialize)]
struct SavedImage {
    #[serde(rename = "Layers")]
    layers: Vec<String>,
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> RunaError + '_ {
    move |e| RunaError::Io {
        path: path.to_path_buf(),
        source: e,
    }
}

/// Extracts one layer archive onto `target`.
///
/// Plain and gzip-compressed tar archives are accepted; compression is
/// detected from the file's magic bytes.
///
/// # Errors
///
/// Returns an error if extraction or hash computation fails.
pub fn extract_layer(archive_path: &Path, target: &Path) -> Result<Layer> {
    tracing::debug!(
        archive = %archive_path.display(),
        target = %target.display(),
        "extracting layer"
    );

    std::fs::create_dir_all(target).map_err(io_err(target))?;
    let mut file = std::fs::File::open(archive_path).map_err(io_err(archive_path))?;
    let size_bytes = file.metadata().map_err(io_err(archive_path))?.len();

    let mut magic = [0_u8; 2];
    let is_gzip = file.read_exact(&mut magic).is_ok() && magic == GZIP_MAGIC;
    let file = std::fs::File::open(archive_path).map_err(io_err(archive_path))?;

    if is_gzip {
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
        archive.unpack(target).map_err(io_err(target))?;
    } else {
        let mut archive = tar::Archive::new(file);
        archive.unpack(target).map_err(io_err(target))?;
    }

    let hash = crate::hash::hash_file(archive_path)?;
    Ok(Layer { hash, size_bytes })
}

/// Applies every layer of a `docker save` archive onto `target`, bottom to top.
///
/// # Errors
///
/// Returns an error if the archive is unreadable, has no `manifest.json`,
/// or a layer fails to extract.
pub fn unpack_saved_image(saved: &Path, target: &Path) -> Result<Vec<Layer>> {
    let scratch = tempfile::tempdir().map_err(io_err(saved))?;
    let file = std::fs::File::open(saved).map_err(io_err(saved))?;
    tar::Archive::new(file)
        .unpack(scratch.path())
        .map_err(io_err(saved))?;

    let manifest_path = scratch.path().join(SAVED_MANIFEST);
    let content = std::fs::read_to_string(&manifest_path).map_err(io_err(&manifest_path))?;
    let images: Vec<SavedImage> = serde_json::from_str(&content)?;
    let image = images.into_iter().next().ok_or_else(|| RunaError::Config {
        message: format!("{} lists no images", saved.display()),
    })?;

    let mut layers = Vec::with_capacity(image.layers.len());
    for name in &image.layers {
        let layer_path: PathBuf = scratch.path().join(name);
        let layer = extract_layer(&layer_path, target)?;
        tracing::debug!(
            layer = %layer.hash.short(12),
            size_bytes = layer.size_bytes,
            "applied layer"
        );
        layers.push(layer);
    }
    tracing::info!(
        saved = %saved.display(),
        layers = layers.len(),
        "unpacked saved image"
    );
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_tar(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, *data)
                .expect("append");
        }
        builder.into_inner().expect("finish")
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        use std::io::Write;
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).expect("write");
        encoder.finish().expect("finish")
    }

    fn saved_image(dir: &Path, layers: &[Vec<u8>]) -> PathBuf {
        let mut builder = tar::Builder::new(Vec::new());
        let mut names = Vec::new();
        for (idx, layer) in layers.iter().enumerate() {
            let name = format!("layer{idx}/layer.tar");
            let mut header = tar::Header::new_gnu();
            header.set_size(layer.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, &name, layer.as_slice())
                .expect("append");
            names.push(name);
        }
        let manifest = serde_json::json!([{ "Config": "config.json", "Layers": names }]);
        let manifest = serde_json::to_vec(&manifest).expect("json");
        let mut header = tar::Header::new_gnu();
        header.set_size(manifest.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, SAVED_MANIFEST, manifest.as_slice())
            .expect("append");

        let path = dir.join("app.tar");
        std::fs::write(&path, builder.into_inner().expect("finish")).expect("write");
        path
    }

    #[test]
    fn extract_plain_layer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("layer.tar");
        std::fs::write(&path, layer_tar(&[("hello", b"hello from layer")])).expect("write");
        let target = dir.path().join("rootfs");

        let layer = extract_layer(&path, &target).expect("extract");
        assert_eq!(
            layer.size_bytes,
            std::fs::metadata(&path).expect("metadata").len()
        );
        assert_eq!(
            layer.hash,
            crate::hash::hash_file(&path).expect("hash")
        );
        assert_eq!(
            std::fs::read_to_string(target.join("hello")).expect("read"),
            "hello from layer"
        );
    }

    #[test]
    fn extract_gzip_layer_detected_by_magic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blob");
        std::fs::write(&path, gzip(&layer_tar(&[("gz", b"zipped")]))).expect("write");
        let target = dir.path().join("rootfs");

        let _ = extract_layer(&path, &target).expect("extract");
        assert_eq!(std::fs::read(target.join("gz")).expect("read"), b"zipped");
    }

    #[test]
    fn unpack_saved_image_applies_layers_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = layer_tar(&[("hello", b"base"), ("etc/motd", b"v1")]);
        let app = layer_tar(&[("tmp/app/myfile", b"app file"), ("etc/motd", b"v2")]);
        let saved = saved_image(dir.path(), &[base, app]);
        let target = dir.path().join("img");

        let layers = unpack_saved_image(&saved, &target).expect("unpack");
        assert_eq!(layers.len(), 2);
        assert_ne!(layers[0].hash, layers[1].hash);
        assert!(target.join("hello").is_file());
        assert_eq!(
            std::fs::read(target.join("tmp/app/myfile")).expect("read"),
            b"app file"
        );
        assert_eq!(std::fs::read(target.join("etc/motd")).expect("read"), b"v2");
    }

    #[test]
    fn unpack_saved_image_without_manifest_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bogus.tar");
        std::fs::write(&path, layer_tar(&[("x", b"y")])).expect("write");
        assert!(unpack_saved_image(&path, &dir.path().join("out")).is_err());
    }

    #[test]
    fn extract_nonexistent_archive_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(extract_layer(&dir.path().join("missing.tar"), &dir.path().join("out")).is_err());
    }
}
