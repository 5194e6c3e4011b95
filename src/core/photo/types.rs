//! Photo resource types and their remote representations.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Discriminator for each kind of photo feed
///
/// Used to partition the shared SQLite table and to route events, so
/// dispatch never depends on the runtime type of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Public gallery of everybody's photos
    Gallery,
    /// Photos the user uploaded
    Uploaded,
    /// Photos the user received in exchange
    Received,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gallery => "gallery",
            Self::Uploaded => "uploaded",
            Self::Received => "received",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "gallery" => Some(Self::Gallery),
            "uploaded" => Some(Self::Uploaded),
            "received" => Some(Self::Received),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Gallery => "Gallery",
            Self::Uploaded => "Uploaded Photos",
            Self::Received => "Received Photos",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item that can live in a paginated, cached photo feed
pub trait FeedItem: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Which feed this item belongs to
    const KIND: FeedKind;

    /// Shape of the item as returned by the remote source
    type Remote: Send + 'static;

    /// Natural key, unique within the feed
    fn stable_key(&self) -> &str;

    /// Ordering key, larger is more recent
    fn recency_key(&self) -> i64;

    /// Validate and convert a remote item
    fn from_remote(raw: Self::Remote) -> Result<Self, String>;
}

/// Geographic position a photo was taken at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    fn validate(lon: f64, lat: f64) -> Result<Self, String> {
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(format!("coordinates out of range: lon={lon}, lat={lat}"));
        }
        Ok(Self { lon, lat })
    }
}

fn require_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("photo name is empty".to_string());
    }
    Ok(())
}

fn require_timestamp(field: &str, value: i64) -> Result<(), String> {
    if value < 0 {
        return Err(format!("{field} is negative: {value}"));
    }
    Ok(())
}

/// A photo in the public gallery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryPhoto {
    pub photo_name: String,
    pub uploader_user_id: String,
    pub uploaded_on_ms: i64,
    pub location: GeoPoint,
    pub favourites_count: u64,
}

/// Gallery photo as served by the photo server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPhotoResponse {
    pub photo_name: String,
    pub uploader_user_id: String,
    pub uploaded_on: i64,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub favourites_count: u64,
}

impl FeedItem for GalleryPhoto {
    const KIND: FeedKind = FeedKind::Gallery;
    type Remote = GalleryPhotoResponse;

    fn stable_key(&self) -> &str {
        &self.photo_name
    }

    fn recency_key(&self) -> i64 {
        self.uploaded_on_ms
    }

    fn from_remote(raw: GalleryPhotoResponse) -> Result<Self, String> {
        require_name(&raw.photo_name)?;
        require_timestamp("uploadedOn", raw.uploaded_on)?;
        Ok(Self {
            location: GeoPoint::validate(raw.lon, raw.lat)?,
            photo_name: raw.photo_name,
            uploader_user_id: raw.uploader_user_id,
            uploaded_on_ms: raw.uploaded_on,
            favourites_count: raw.favourites_count,
        })
    }
}

/// A photo the user uploaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedPhoto {
    pub photo_name: String,
    pub uploaded_on_ms: i64,
    pub location: GeoPoint,
    /// Whether somebody has received this photo yet
    pub has_receiver: bool,
}

/// Uploaded photo as served by the photo server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedPhotoResponse {
    pub photo_name: String,
    pub uploaded_on: i64,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub has_receiver: bool,
}

impl FeedItem for UploadedPhoto {
    const KIND: FeedKind = FeedKind::Uploaded;
    type Remote = UploadedPhotoResponse;

    fn stable_key(&self) -> &str {
        &self.photo_name
    }

    fn recency_key(&self) -> i64 {
        self.uploaded_on_ms
    }

    fn from_remote(raw: UploadedPhotoResponse) -> Result<Self, String> {
        require_name(&raw.photo_name)?;
        require_timestamp("uploadedOn", raw.uploaded_on)?;
        Ok(Self {
            location: GeoPoint::validate(raw.lon, raw.lat)?,
            photo_name: raw.photo_name,
            uploaded_on_ms: raw.uploaded_on,
            has_receiver: raw.has_receiver,
        })
    }
}

/// A photo the user received from somebody else
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedPhoto {
    pub photo_name: String,
    pub uploader_user_id: String,
    pub received_on_ms: i64,
    pub location: GeoPoint,
}

/// Received photo as served by the photo server
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedPhotoResponse {
    pub photo_name: String,
    pub uploader_user_id: String,
    pub received_on: i64,
    pub lon: f64,
    pub lat: f64,
}

impl FeedItem for ReceivedPhoto {
    const KIND: FeedKind = FeedKind::Received;
    type Remote = ReceivedPhotoResponse;

    fn stable_key(&self) -> &str {
        &self.photo_name
    }

    fn recency_key(&self) -> i64 {
        self.received_on_ms
    }

    fn from_remote(raw: ReceivedPhotoResponse) -> Result<Self, String> {
        require_name(&raw.photo_name)?;
        require_timestamp("receivedOn", raw.received_on)?;
        Ok(Self {
            location: GeoPoint::validate(raw.lon, raw.lat)?,
            photo_name: raw.photo_name,
            uploader_user_id: raw.uploader_user_id,
            received_on_ms: raw.received_on,
        })
    }
}
