//! Media commands: upload and delete product images.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use sokoni_console::media::{
    DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, FileUpload, ProgressFn, compress_image,
};

use super::Context;

/// Upload an image, optionally downscaling it first.
///
/// # Errors
///
/// Returns an error if configuration fails to load, the file cannot be
/// read, it fails validation, or the upload fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub async fn upload(
    path: &str,
    product_id: Option<&str>,
    compress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    let media = ctx.media();

    let mut file = FileUpload::from_path(path)?;
    info!(
        "Read {} ({} bytes, {})",
        file.name,
        file.len(),
        file.content_type
    );

    if compress {
        file = compress_image(&file, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY).await?;
        info!("Compressed to {} bytes", file.len());
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}%")?
            .progress_chars("#>-"),
    );
    let reporter = bar.clone();
    let progress: ProgressFn = Box::new(move |pct| reporter.set_position(pct.round() as u64));

    let result = media
        .upload_product_image(&file, product_id, Some(progress))
        .await;
    bar.finish_and_clear();

    let url = result?;
    info!("Uploaded: {url}");
    Ok(())
}

/// Delete an object by download URL or storage path.
///
/// # Errors
///
/// Returns an error if configuration fails to load or the delete fails.
pub async fn delete(reference: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load()?;
    ctx.media().delete_file(reference).await?;
    info!("Deleted {reference}");
    Ok(())
}
