//! Admin server actions over the repository layer.
//!
//! Every failure crossing this boundary is one of exactly two buckets:
//! [`ActionError::Unauthorized`] when no admin session is present, and
//! [`ActionError::Failed`] for everything else, carrying a display-ready
//! message. Nothing panics across this boundary; callers show the message
//! and revert any optimistic UI update.

use crate::db::{self, Collection, Pool};
use crate::model::{is_valid_slug, BannerLayout};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

/// Proof of an authenticated admin. Produced by the external auth service;
/// this layer only checks presence.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub user_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Failed(String),
}

pub type ActionResult<T> = Result<T, ActionError>;

fn require_session(session: Option<&AdminSession>) -> ActionResult<&AdminSession> {
    session.ok_or(ActionError::Unauthorized)
}

/// Collapse a repository error into the "operation failed" bucket, giving
/// unique-slug conflicts a friendlier message.
fn map_db_err(err: anyhow::Error, conflict_msg: &str) -> ActionError {
    if db::is_unique_violation(&err) {
        return ActionError::Failed(conflict_msg.to_string());
    }
    warn!(?err, "action failed");
    ActionError::Failed("operation failed".to_string())
}

const SLUG_CONFLICT: &str = "a post with this slug already exists";
const DUPLICATE_CONFLICT: &str = "a duplicate entry already exists";

// ---- blog posts ----

pub struct PostInput<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub excerpt: Option<&'a str>,
    pub content: &'a str,
    pub cover_image: Option<&'a str>,
}

fn validate_post(input: &PostInput<'_>) -> ActionResult<()> {
    if !is_valid_slug(input.slug) {
        return Err(ActionError::Failed(
            "slug must be lowercase letters, digits and single hyphens".to_string(),
        ));
    }
    if input.title.trim().is_empty() {
        return Err(ActionError::Failed("title must not be empty".to_string()));
    }
    Ok(())
}

pub async fn create_post(
    pool: &Pool,
    session: Option<&AdminSession>,
    input: PostInput<'_>,
) -> ActionResult<i64> {
    let admin = require_session(session)?;
    validate_post(&input)?;
    let id = db::insert_post(
        pool,
        input.slug,
        input.title,
        input.excerpt,
        input.content,
        input.cover_image,
    )
    .await
    .map_err(|e| map_db_err(e, SLUG_CONFLICT))?;
    info!(admin = %admin.user_id, id, slug = input.slug, "created post");
    Ok(id)
}

pub async fn update_post(
    pool: &Pool,
    session: Option<&AdminSession>,
    id: i64,
    input: PostInput<'_>,
) -> ActionResult<()> {
    require_session(session)?;
    validate_post(&input)?;
    db::update_post(
        pool,
        id,
        input.slug,
        input.title,
        input.excerpt,
        input.content,
        input.cover_image,
    )
    .await
    .map_err(|e| map_db_err(e, SLUG_CONFLICT))
}

pub async fn set_post_published(
    pool: &Pool,
    session: Option<&AdminSession>,
    id: i64,
    published: bool,
) -> ActionResult<()> {
    require_session(session)?;
    db::set_post_published(pool, id, published)
        .await
        .map_err(|e| map_db_err(e, SLUG_CONFLICT))
}

pub async fn delete_post(
    pool: &Pool,
    session: Option<&AdminSession>,
    id: i64,
) -> ActionResult<()> {
    require_session(session)?;
    db::delete_post(pool, id)
        .await
        .map_err(|e| map_db_err(e, SLUG_CONFLICT))
}

// ---- banners ----

pub struct BannerInput<'a> {
    pub layout: BannerLayout,
    pub headline: &'a str,
    pub subheadline: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub link_url: Option<&'a str>,
}

fn validate_banner(input: &BannerInput<'_>) -> ActionResult<()> {
    if input.headline.trim().is_empty() {
        return Err(ActionError::Failed("headline must not be empty".to_string()));
    }
    Ok(())
}

pub async fn create_banner(
    pool: &Pool,
    session: Option<&AdminSession>,
    input: BannerInput<'_>,
) -> ActionResult<i64> {
    require_session(session)?;
    validate_banner(&input)?;
    db::insert_banner(
        pool,
        input.layout,
        input.headline,
        input.subheadline,
        input.image_url,
        input.link_url,
    )
    .await
    .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

pub async fn update_banner(
    pool: &Pool,
    session: Option<&AdminSession>,
    id: i64,
    input: BannerInput<'_>,
) -> ActionResult<()> {
    require_session(session)?;
    validate_banner(&input)?;
    db::update_banner(
        pool,
        id,
        input.layout,
        input.headline,
        input.subheadline,
        input.image_url,
        input.link_url,
    )
    .await
    .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

// ---- testimonials / FAQ / gallery ----

pub async fn create_testimonial(
    pool: &Pool,
    session: Option<&AdminSession>,
    author: &str,
    quote: &str,
    rating: Option<i64>,
) -> ActionResult<i64> {
    require_session(session)?;
    if author.trim().is_empty() || quote.trim().is_empty() {
        return Err(ActionError::Failed(
            "author and quote must not be empty".to_string(),
        ));
    }
    if let Some(r) = rating {
        if !(1..=5).contains(&r) {
            return Err(ActionError::Failed("rating must be 1 to 5".to_string()));
        }
    }
    db::insert_testimonial(pool, author, quote, rating)
        .await
        .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

pub async fn update_testimonial(
    pool: &Pool,
    session: Option<&AdminSession>,
    id: i64,
    author: &str,
    quote: &str,
    rating: Option<i64>,
) -> ActionResult<()> {
    require_session(session)?;
    if author.trim().is_empty() || quote.trim().is_empty() {
        return Err(ActionError::Failed(
            "author and quote must not be empty".to_string(),
        ));
    }
    if let Some(r) = rating {
        if !(1..=5).contains(&r) {
            return Err(ActionError::Failed("rating must be 1 to 5".to_string()));
        }
    }
    db::update_testimonial(pool, id, author, quote, rating)
        .await
        .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

pub async fn create_faq(
    pool: &Pool,
    session: Option<&AdminSession>,
    question: &str,
    answer: &str,
) -> ActionResult<i64> {
    require_session(session)?;
    if question.trim().is_empty() || answer.trim().is_empty() {
        return Err(ActionError::Failed(
            "question and answer must not be empty".to_string(),
        ));
    }
    db::insert_faq(pool, question, answer)
        .await
        .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

pub async fn update_faq(
    pool: &Pool,
    session: Option<&AdminSession>,
    id: i64,
    question: &str,
    answer: &str,
) -> ActionResult<()> {
    require_session(session)?;
    if question.trim().is_empty() || answer.trim().is_empty() {
        return Err(ActionError::Failed(
            "question and answer must not be empty".to_string(),
        ));
    }
    db::update_faq(pool, id, question, answer)
        .await
        .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

pub async fn create_gallery_image(
    pool: &Pool,
    session: Option<&AdminSession>,
    image_url: &str,
    caption: Option<&str>,
) -> ActionResult<i64> {
    require_session(session)?;
    if image_url.trim().is_empty() {
        return Err(ActionError::Failed("image url must not be empty".to_string()));
    }
    db::insert_gallery_image(pool, image_url, caption)
        .await
        .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

pub async fn update_gallery_image(
    pool: &Pool,
    session: Option<&AdminSession>,
    id: i64,
    image_url: &str,
    caption: Option<&str>,
) -> ActionResult<()> {
    require_session(session)?;
    if image_url.trim().is_empty() {
        return Err(ActionError::Failed("image url must not be empty".to_string()));
    }
    db::update_gallery_image(pool, id, image_url, caption)
        .await
        .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

/// Flip an activation flag on any ordered collection.
pub async fn set_active(
    pool: &Pool,
    session: Option<&AdminSession>,
    collection: Collection,
    id: i64,
    active: bool,
) -> ActionResult<()> {
    require_session(session)?;
    db::set_collection_active(pool, collection, id, active)
        .await
        .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

pub async fn delete_item(
    pool: &Pool,
    session: Option<&AdminSession>,
    collection: Collection,
    id: i64,
) -> ActionResult<()> {
    require_session(session)?;
    db::delete_from_collection(pool, collection, id)
        .await
        .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

/// Persist a drag-to-reorder result: `ids` is the complete new display
/// order. One batch call; on failure the UI reverts its optimistic update.
pub async fn reorder_collection(
    pool: &Pool,
    session: Option<&AdminSession>,
    collection: Collection,
    ids: &[i64],
) -> ActionResult<()> {
    require_session(session)?;
    db::reorder(pool, collection, ids)
        .await
        .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))
}

// ---- contact form (public, no session) ----

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub struct ContactInput<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub message: &'a str,
}

/// Store a visitor's contact message and enqueue the notification email.
/// Returns the reference code shown to the visitor.
pub async fn submit_contact_form(pool: &Pool, input: ContactInput<'_>) -> ActionResult<String> {
    if input.name.trim().is_empty() || input.message.trim().is_empty() {
        return Err(ActionError::Failed(
            "name and message must not be empty".to_string(),
        ));
    }
    if !EMAIL_RE.is_match(input.email) {
        return Err(ActionError::Failed("invalid email address".to_string()));
    }
    let (_id, reference) =
        db::insert_contact_message(pool, input.name, input.email, input.phone, input.message)
            .await
            .map_err(|e| map_db_err(e, DUPLICATE_CONFLICT))?;
    Ok(reference)
}
