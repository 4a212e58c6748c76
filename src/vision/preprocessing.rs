// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the detector, CLIP and Places365 models
//!
//! Every model gets its own input geometry and normalization. Decoded
//! images stay at their source resolution until they reach one of these
//! functions.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Detector input size (square letterbox)
pub const DETECTOR_INPUT_SIZE: u32 = 640;

/// Letterbox padding value used by the YOLO exporters
const LETTERBOX_FILL: u8 = 114;

/// CLIP ViT-B/32 input resolution
pub const CLIP_INPUT_SIZE: u32 = 224;

/// CLIP normalization mean values
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std values
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Places365 resize target (shorter side) before center crop
pub const SCENE_RESIZE_SIZE: u32 = 256;

/// Places365 crop size
pub const SCENE_INPUT_SIZE: u32 = 224;

/// Mean values for normalization (ImageNet)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for normalization (ImageNet)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Scale and padding applied by [`letterbox`]
///
/// Used to map detector boxes back to source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied to the source image
    pub scale: f32,
    /// Horizontal padding (left edge)
    pub pad_x: f32,
    /// Vertical padding (top edge)
    pub pad_y: f32,
    /// Source image width
    pub original_width: u32,
    /// Source image height
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Map a point from letterboxed space back to the source image,
    /// clamped to the image bounds
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        let ox = ((x - self.pad_x) / scale).clamp(0.0, self.original_width as f32);
        let oy = ((y - self.pad_y) / scale).clamp(0.0, self.original_height as f32);
        (ox, oy)
    }
}

/// Letterbox an image into a square detector input
///
/// Steps:
/// 1. Scale to fit `target_size` preserving aspect ratio
/// 2. Center on a gray (114) canvas
/// 3. Scale pixels to [0, 1], no mean/std
/// 4. Convert to NCHW tensor format [1, 3, H, W]
pub fn letterbox(image: &DynamicImage, target_size: u32) -> (Array4<f32>, LetterboxInfo) {
    let (orig_w, orig_h) = image.dimensions();
    let fill = Rgb([LETTERBOX_FILL; 3]);

    if orig_w == 0 || orig_h == 0 {
        let canvas = RgbImage::from_pixel(target_size, target_size, fill);
        let info = LetterboxInfo {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            original_width: orig_w,
            original_height: orig_h,
        };
        return (to_nchw(&canvas, [0.0; 3], [1.0; 3]), info);
    }

    let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

    let resized = image
        .resize_exact(new_w, new_h, FilterType::Triangle)
        .to_rgb8();

    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;

    let mut canvas = RgbImage::from_pixel(target_size, target_size, fill);
    image::imageops::replace(&mut canvas, &resized, offset_x as i64, offset_y as i64);

    let info = LetterboxInfo {
        scale,
        pad_x: offset_x as f32,
        pad_y: offset_y as f32,
        original_width: orig_w,
        original_height: orig_h,
    };

    (to_nchw(&canvas, [0.0; 3], [1.0; 3]), info)
}

/// Preprocess an image for the CLIP visual encoder
///
/// Bicubic resize of the shorter side to 224, center crop to 224x224,
/// CLIP mean/std normalization, NCHW layout.
pub fn preprocess_for_clip(image: &DynamicImage) -> Array4<f32> {
    let cropped = resize_and_center_crop(image, CLIP_INPUT_SIZE, CLIP_INPUT_SIZE, FilterType::CatmullRom);
    to_nchw(&cropped, CLIP_MEAN, CLIP_STD)
}

/// Preprocess an image for the Places365 scene classifier
///
/// Resize of the shorter side to 256, center crop to 224x224, ImageNet
/// mean/std normalization, NCHW layout.
pub fn preprocess_for_scene(image: &DynamicImage) -> Array4<f32> {
    let cropped = resize_and_center_crop(image, SCENE_RESIZE_SIZE, SCENE_INPUT_SIZE, FilterType::Triangle);
    to_nchw(&cropped, IMAGENET_MEAN, IMAGENET_STD)
}

/// Resize so the shorter side equals `resize_to`, then take the centered
/// `crop` x `crop` window
pub fn resize_and_center_crop(
    image: &DynamicImage,
    resize_to: u32,
    crop: u32,
    filter: FilterType,
) -> RgbImage {
    let (orig_w, orig_h) = image.dimensions();

    if orig_w == 0 || orig_h == 0 {
        return RgbImage::new(crop, crop);
    }

    let scale = resize_to as f32 / orig_w.min(orig_h) as f32;
    let new_w = ((orig_w as f32 * scale).round() as u32).max(crop);
    let new_h = ((orig_h as f32 * scale).round() as u32).max(crop);

    let resized = image.resize_exact(new_w, new_h, filter);
    let x = (new_w - crop) / 2;
    let y = (new_h - crop) / 2;

    resized.crop_imm(x, y, crop, crop).to_rgb8()
}

/// Convert an RGB image into a normalized NCHW tensor:
/// `(pixel / 255 - mean) / std`
pub fn to_nchw(rgb: &RgbImage, mean: [f32; 3], std: [f32; 3]) -> Array4<f32> {
    let (width, height) = rgb.dimensions();
    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - mean[c]) / std[c];
        }
    }

    tensor
}
