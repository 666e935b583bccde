//! Storage for uploaded meter images.
//!
//! Images are decoded from base64 request payloads and written to the
//! temporary image directory, from where they are served behind signed links.

pub mod image_store;

pub use image_store::{decode_base64_image, DecodedImage, ImageKind, ImageStore, StoredImage};
