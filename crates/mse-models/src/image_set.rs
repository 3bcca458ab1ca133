//! Image set (study) and image record models
//!
//! Tables: image_sets, images

use chrono::{DateTime, Utc};
use mse_core::traits::{Entity, Id, Identifiable, Timestamped};
use mse_core::types::ImageKind;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named study grouping real and synthetic images
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImageSet {
    pub id: Id,
    /// Unique study name
    pub name: String,
    pub description: String,
    pub created_by_id: Option<Id>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for ImageSet {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for ImageSet {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl Entity for ImageSet {
    const TABLE_NAME: &'static str = "image_sets";
    const TYPE_NAME: &'static str = "ImageSet";
}

/// Image set with per-kind image counts, for admin listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImageSetSummary {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub real_count: i64,
    pub synthetic_count: i64,
}

impl ImageSetSummary {
    pub fn total_images(&self) -> i64 {
        self.real_count + self.synthetic_count
    }
}

/// One stored image with its fixed ground truth
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImageRecord {
    pub id: Id,
    pub image_set_id: Id,
    /// Storage key, e.g. `image_sets/study1/9f0c3a6e5b2d4c1f8e7a6b5c4d3e2f1a.jpg`
    pub path: String,
    pub original_filename: String,
    pub is_real: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl Identifiable for ImageRecord {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for ImageRecord {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.uploaded_at)
    }
}

impl Entity for ImageRecord {
    const TABLE_NAME: &'static str = "images";
    const TYPE_NAME: &'static str = "Image";
}

impl ImageRecord {
    pub fn kind(&self) -> ImageKind {
        ImageKind::from_is_real(self.is_real)
    }
}

/// Data for inserting an image set
#[derive(Debug, Clone)]
pub struct NewImageSet {
    pub name: String,
    pub description: String,
    pub created_by_id: Option<Id>,
}

/// Data for inserting an image record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub path: String,
    pub original_filename: String,
    pub is_real: bool,
}
