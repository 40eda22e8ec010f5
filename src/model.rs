use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Slug shape required for blog posts: lowercase alphanumeric runs joined by
/// single hyphens. Uniqueness is enforced by the store, not here.
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap());

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Rendering variant for a promo banner. Stored as its kebab-case string form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BannerLayout {
    FullImage,
    TextOverlay,
    Split,
}

impl BannerLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            BannerLayout::FullImage => "full-image",
            BannerLayout::TextOverlay => "text-overlay",
            BannerLayout::Split => "split",
        }
    }

    pub fn parse_layout(s: &str) -> Option<Self> {
        match s {
            "full-image" => Some(BannerLayout::FullImage),
            "text-overlay" => Some(BannerLayout::TextOverlay),
            "split" => Some(BannerLayout::Split),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutboxKind {
    SendContactEmail,
}

impl OutboxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxKind::SendContactEmail => "send_contact_email",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        match s {
            "send_contact_email" => Some(OutboxKind::SendContactEmail),
            _ => None,
        }
    }
}

/// Blog post. `content` holds either raw HTML (as persisted by the rich-text
/// editor) or the constrained markdown dialect; which one is inferred at
/// render time by [`crate::markup::is_markup_html`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub id: i64,
    pub layout: BannerLayout,
    pub headline: String,
    pub subheadline: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: i64,
    pub author: String,
    pub quote: String,
    pub rating: Option<i64>,
    pub sort_order: i64,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: i64,
    pub image_url: String,
    pub caption: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Locally mirrored Instagram media item; `media_id` is the upsert key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramPost {
    pub id: i64,
    pub media_id: String,
    pub caption: Option<String>,
    pub media_url: String,
    pub permalink: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    pub reference: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
