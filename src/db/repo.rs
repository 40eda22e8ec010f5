use super::model::ContactForOutbox;
use crate::model::{
    Banner, BannerLayout, BlogPost, ContactMessage, FaqEntry, GalleryImage, InstagramPost,
    OutboxKind, Testimonial,
};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    // Pass through non-sqlite schemes
    if !url.starts_with("sqlite:") {
        return url.to_string();
    }

    // In-memory URLs like sqlite::memory: or sqlite::memory:?cache=shared
    if url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    // Strip prefix and optional //
    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    // Separate query string if any
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        // nothing to normalize
        return url.to_string();
    }

    // Expand leading ~/ to HOME
    let expanded_path = if let Some(rest) = path_part.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            format!("{}/{}", home.trim_end_matches('/'), rest)
        } else {
            path_part.to_string()
        }
    } else {
        path_part.to_string()
    };

    // Ensure parent directory exists if any
    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Whether the error is a unique-constraint violation (e.g. a duplicate blog
/// slug). The store enforces uniqueness; the action layer turns this into a
/// friendly message.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}

// ---- blog posts ----

fn map_post(row: &SqliteRow) -> Result<BlogPost> {
    Ok(BlogPost {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        excerpt: row.try_get("excerpt").ok().flatten(),
        content: row.get("content"),
        cover_image: row.try_get("cover_image").ok().flatten(),
        is_published: row.get("is_published"),
        published_at: row.try_get("published_at").ok().flatten(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[instrument(skip_all)]
pub async fn insert_post(
    pool: &Pool,
    slug: &str,
    title: &str,
    excerpt: Option<&str>,
    content: &str,
    cover_image: Option<&str>,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO blog_posts (slug, title, excerpt, content, cover_image) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(slug)
    .bind(title)
    .bind(excerpt)
    .bind(content)
    .bind(cover_image)
    .fetch_one(pool)
    .await?;
    Ok(rec.get("id"))
}

#[instrument(skip_all)]
pub async fn get_post_by_slug(pool: &Pool, slug: &str) -> Result<Option<BlogPost>> {
    let row = sqlx::query("SELECT * FROM blog_posts WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_post).transpose()
}

#[instrument(skip_all)]
pub async fn list_posts(pool: &Pool, published_only: bool) -> Result<Vec<BlogPost>> {
    let sql = if published_only {
        "SELECT * FROM blog_posts WHERE is_published = 1 ORDER BY published_at DESC, id DESC"
    } else {
        "SELECT * FROM blog_posts ORDER BY created_at DESC, id DESC"
    };
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    rows.iter().map(map_post).collect()
}

#[instrument(skip_all)]
pub async fn update_post(
    pool: &Pool,
    id: i64,
    slug: &str,
    title: &str,
    excerpt: Option<&str>,
    content: &str,
    cover_image: Option<&str>,
) -> Result<()> {
    let res = sqlx::query(
        "UPDATE blog_posts SET slug = ?, title = ?, excerpt = ?, content = ?, cover_image = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(slug)
    .bind(title)
    .bind(excerpt)
    .bind(content)
    .bind(cover_image)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("post {} not found", id));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn set_post_published(pool: &Pool, id: i64, published: bool) -> Result<()> {
    let sql = if published {
        "UPDATE blog_posts SET is_published = 1, published_at = COALESCE(published_at, CURRENT_TIMESTAMP), updated_at = CURRENT_TIMESTAMP WHERE id = ?"
    } else {
        "UPDATE blog_posts SET is_published = 0, updated_at = CURRENT_TIMESTAMP WHERE id = ?"
    };
    let res = sqlx::query(sql).bind(id).execute(pool).await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("post {} not found", id));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn delete_post(pool: &Pool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM blog_posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---- ordered collections ----
//
// Banners, testimonials, FAQ entries and gallery images share the same
// ordering contract: `sort_order` is a non-negative integer, not required
// unique, and display order is `sort_order, id`. New rows are appended after
// the current maximum inside one transaction.

/// Table selector for the reorder batch. Only the ordered collections are
/// listed here; blog posts order by publication date instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Banners,
    Testimonials,
    FaqEntries,
    GalleryImages,
}

impl Collection {
    fn table(&self) -> &'static str {
        match self {
            Collection::Banners => "banners",
            Collection::Testimonials => "testimonials",
            Collection::FaqEntries => "faq_entries",
            Collection::GalleryImages => "gallery_images",
        }
    }

    fn active_column(&self) -> &'static str {
        match self {
            Collection::Testimonials => "is_featured",
            _ => "is_active",
        }
    }
}

async fn next_sort_order(tx: &mut Transaction<'_, Sqlite>, table: &str) -> Result<i64> {
    let max: Option<i64> = sqlx::query_scalar(&format!("SELECT MAX(sort_order) FROM {table}"))
        .fetch_one(&mut **tx)
        .await?;
    Ok(max.map_or(0, |m| m + 1))
}

/// Persist a full reordering in one batch: `ids` is the complete display
/// order and each row's `sort_order` becomes its position. Runs in a single
/// transaction; an unknown id aborts the whole batch and the caller reverts
/// its optimistic update.
#[instrument(skip_all)]
pub async fn reorder(pool: &Pool, collection: Collection, ids: &[i64]) -> Result<()> {
    let mut tx = pool.begin().await?;
    let sql = format!(
        "UPDATE {} SET sort_order = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        collection.table()
    );
    for (position, id) in ids.iter().enumerate() {
        let res = sqlx::query(&sql)
            .bind(position as i64)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            return Err(anyhow!("unknown id {} in {} reorder", id, collection.table()));
        }
    }
    tx.commit().await?;
    Ok(())
}

/// Flip the activation flag (`is_active`, or `is_featured` for
/// testimonials) on one row of an ordered collection.
#[instrument(skip_all)]
pub async fn set_collection_active(
    pool: &Pool,
    collection: Collection,
    id: i64,
    active: bool,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET {} = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        collection.table(),
        collection.active_column()
    );
    let res = sqlx::query(&sql).bind(active).bind(id).execute(pool).await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("{} {} not found", collection.table(), id));
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn delete_from_collection(pool: &Pool, collection: Collection, id: i64) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE id = ?", collection.table()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---- banners ----

fn map_banner(row: &SqliteRow) -> Result<Banner> {
    let layout: String = row.get("layout");
    let layout = BannerLayout::parse_layout(&layout)
        .ok_or_else(|| anyhow!("banner has unknown layout {}", layout))?;
    Ok(Banner {
        id: row.get("id"),
        layout,
        headline: row.get("headline"),
        subheadline: row.try_get("subheadline").ok().flatten(),
        image_url: row.try_get("image_url").ok().flatten(),
        link_url: row.try_get("link_url").ok().flatten(),
        sort_order: row.get("sort_order"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[instrument(skip_all)]
pub async fn insert_banner(
    pool: &Pool,
    layout: BannerLayout,
    headline: &str,
    subheadline: Option<&str>,
    image_url: Option<&str>,
    link_url: Option<&str>,
) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let sort_order = next_sort_order(&mut tx, "banners").await?;
    let rec = sqlx::query(
        "INSERT INTO banners (layout, headline, subheadline, image_url, link_url, sort_order) VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(layout.as_str())
    .bind(headline)
    .bind(subheadline)
    .bind(image_url)
    .bind(link_url)
    .bind(sort_order)
    .fetch_one(&mut *tx)
    .await?;
    let id: i64 = rec.get("id");
    tx.commit().await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn list_banners(pool: &Pool, active_only: bool) -> Result<Vec<Banner>> {
    let sql = if active_only {
        "SELECT * FROM banners WHERE is_active = 1 ORDER BY sort_order, id"
    } else {
        "SELECT * FROM banners ORDER BY sort_order, id"
    };
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    rows.iter().map(map_banner).collect()
}

#[instrument(skip_all)]
pub async fn update_banner(
    pool: &Pool,
    id: i64,
    layout: BannerLayout,
    headline: &str,
    subheadline: Option<&str>,
    image_url: Option<&str>,
    link_url: Option<&str>,
) -> Result<()> {
    let res = sqlx::query(
        "UPDATE banners SET layout = ?, headline = ?, subheadline = ?, image_url = ?, link_url = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(layout.as_str())
    .bind(headline)
    .bind(subheadline)
    .bind(image_url)
    .bind(link_url)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("banner {} not found", id));
    }
    Ok(())
}

// ---- testimonials ----

fn map_testimonial(row: &SqliteRow) -> Result<Testimonial> {
    Ok(Testimonial {
        id: row.get("id"),
        author: row.get("author"),
        quote: row.get("quote"),
        rating: row.try_get("rating").ok().flatten(),
        sort_order: row.get("sort_order"),
        is_featured: row.get("is_featured"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[instrument(skip_all)]
pub async fn insert_testimonial(
    pool: &Pool,
    author: &str,
    quote: &str,
    rating: Option<i64>,
) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let sort_order = next_sort_order(&mut tx, "testimonials").await?;
    let rec = sqlx::query(
        "INSERT INTO testimonials (author, quote, rating, sort_order) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(author)
    .bind(quote)
    .bind(rating)
    .bind(sort_order)
    .fetch_one(&mut *tx)
    .await?;
    let id: i64 = rec.get("id");
    tx.commit().await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn list_testimonials(pool: &Pool, featured_only: bool) -> Result<Vec<Testimonial>> {
    let sql = if featured_only {
        "SELECT * FROM testimonials WHERE is_featured = 1 ORDER BY sort_order, id"
    } else {
        "SELECT * FROM testimonials ORDER BY sort_order, id"
    };
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    rows.iter().map(map_testimonial).collect()
}

#[instrument(skip_all)]
pub async fn update_testimonial(
    pool: &Pool,
    id: i64,
    author: &str,
    quote: &str,
    rating: Option<i64>,
) -> Result<()> {
    let res = sqlx::query(
        "UPDATE testimonials SET author = ?, quote = ?, rating = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(author)
    .bind(quote)
    .bind(rating)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("testimonial {} not found", id));
    }
    Ok(())
}

// ---- FAQ entries ----

fn map_faq(row: &SqliteRow) -> Result<FaqEntry> {
    Ok(FaqEntry {
        id: row.get("id"),
        question: row.get("question"),
        answer: row.get("answer"),
        sort_order: row.get("sort_order"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[instrument(skip_all)]
pub async fn insert_faq(pool: &Pool, question: &str, answer: &str) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let sort_order = next_sort_order(&mut tx, "faq_entries").await?;
    let rec = sqlx::query(
        "INSERT INTO faq_entries (question, answer, sort_order) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(question)
    .bind(answer)
    .bind(sort_order)
    .fetch_one(&mut *tx)
    .await?;
    let id: i64 = rec.get("id");
    tx.commit().await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn list_faqs(pool: &Pool, active_only: bool) -> Result<Vec<FaqEntry>> {
    let sql = if active_only {
        "SELECT * FROM faq_entries WHERE is_active = 1 ORDER BY sort_order, id"
    } else {
        "SELECT * FROM faq_entries ORDER BY sort_order, id"
    };
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    rows.iter().map(map_faq).collect()
}

#[instrument(skip_all)]
pub async fn update_faq(pool: &Pool, id: i64, question: &str, answer: &str) -> Result<()> {
    let res = sqlx::query(
        "UPDATE faq_entries SET question = ?, answer = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(question)
    .bind(answer)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("faq entry {} not found", id));
    }
    Ok(())
}

// ---- gallery images ----

fn map_gallery(row: &SqliteRow) -> Result<GalleryImage> {
    Ok(GalleryImage {
        id: row.get("id"),
        image_url: row.get("image_url"),
        caption: row.try_get("caption").ok().flatten(),
        sort_order: row.get("sort_order"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[instrument(skip_all)]
pub async fn insert_gallery_image(
    pool: &Pool,
    image_url: &str,
    caption: Option<&str>,
) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let sort_order = next_sort_order(&mut tx, "gallery_images").await?;
    let rec = sqlx::query(
        "INSERT INTO gallery_images (image_url, caption, sort_order) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(image_url)
    .bind(caption)
    .bind(sort_order)
    .fetch_one(&mut *tx)
    .await?;
    let id: i64 = rec.get("id");
    tx.commit().await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn list_gallery_images(pool: &Pool, active_only: bool) -> Result<Vec<GalleryImage>> {
    let sql = if active_only {
        "SELECT * FROM gallery_images WHERE is_active = 1 ORDER BY sort_order, id"
    } else {
        "SELECT * FROM gallery_images ORDER BY sort_order, id"
    };
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    rows.iter().map(map_gallery).collect()
}

#[instrument(skip_all)]
pub async fn update_gallery_image(
    pool: &Pool,
    id: i64,
    image_url: &str,
    caption: Option<&str>,
) -> Result<()> {
    let res = sqlx::query(
        "UPDATE gallery_images SET image_url = ?, caption = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(image_url)
    .bind(caption)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("gallery image {} not found", id));
    }
    Ok(())
}

// ---- instagram mirror ----

fn map_instagram(row: &SqliteRow) -> Result<InstagramPost> {
    Ok(InstagramPost {
        id: row.get("id"),
        media_id: row.get("media_id"),
        caption: row.try_get("caption").ok().flatten(),
        media_url: row.get("media_url"),
        permalink: row.get("permalink"),
        posted_at: row.try_get("posted_at").ok().flatten(),
        fetched_at: row.get("fetched_at"),
    })
}

#[instrument(skip_all)]
pub async fn upsert_instagram_post(
    pool: &Pool,
    media_id: &str,
    caption: Option<&str>,
    media_url: &str,
    permalink: &str,
    posted_at: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO instagram_posts (media_id, caption, media_url, permalink, posted_at) \
         VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(media_id) DO UPDATE SET \
             caption = excluded.caption, \
             media_url = excluded.media_url, \
             permalink = excluded.permalink, \
             posted_at = excluded.posted_at, \
             fetched_at = CURRENT_TIMESTAMP",
    )
    .bind(media_id)
    .bind(caption)
    .bind(media_url)
    .bind(permalink)
    .bind(posted_at)
    .execute(pool)
    .await
    .context("failed to upsert instagram post")?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn list_instagram_posts(pool: &Pool, limit: i64) -> Result<Vec<InstagramPost>> {
    let rows = sqlx::query(
        "SELECT * FROM instagram_posts ORDER BY COALESCE(posted_at, fetched_at) DESC, id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_instagram).collect()
}

/// Drop mirrored media beyond the newest `keep` rows.
#[instrument(skip_all)]
pub async fn prune_instagram_posts(pool: &Pool, keep: i64) -> Result<u64> {
    let res = sqlx::query(
        "DELETE FROM instagram_posts WHERE id NOT IN ( \
             SELECT id FROM instagram_posts \
             ORDER BY COALESCE(posted_at, fetched_at) DESC, id DESC LIMIT ?)",
    )
    .bind(keep)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

// ---- contact messages ----

/// Store a contact message and enqueue the notification email in the same
/// transaction, so a stored message always has a pending send.
#[instrument(skip_all)]
pub async fn insert_contact_message(
    pool: &Pool,
    name: &str,
    email: &str,
    phone: Option<&str>,
    message: &str,
) -> Result<(i64, String)> {
    let reference = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;
    let rec = sqlx::query(
        "INSERT INTO contact_messages (reference, name, email, phone, message) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&reference)
    .bind(name)
    .bind(email)
    .bind(phone)
    .bind(message)
    .fetch_one(&mut *tx)
    .await?;
    let id: i64 = rec.get("id");
    enqueue_outbox_tx(&mut tx, OutboxKind::SendContactEmail, id, Utc::now()).await?;
    tx.commit().await?;
    Ok((id, reference))
}

/// Admin inbox view, newest first.
#[instrument(skip_all)]
pub async fn list_contact_messages(pool: &Pool) -> Result<Vec<ContactMessage>> {
    let rows = sqlx::query("SELECT * FROM contact_messages ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await?;
    rows.iter()
        .map(|row| {
            Ok(ContactMessage {
                id: row.get("id"),
                reference: row.get("reference"),
                name: row.get("name"),
                email: row.get("email"),
                phone: row.try_get("phone").ok().flatten(),
                message: row.get("message"),
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

pub async fn fetch_contact_for_outbox(pool: &Pool, id: i64) -> Result<ContactForOutbox> {
    let row = sqlx::query(
        "SELECT reference, name, email, phone, message FROM contact_messages WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(anyhow!("contact message {} not found", id));
    };

    Ok(ContactForOutbox {
        reference: row.get("reference"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.try_get("phone").ok().flatten(),
        message: row.get("message"),
    })
}

// ---- outbox ----

#[instrument(skip_all)]
pub async fn enqueue_outbox(
    pool: &Pool,
    kind: OutboxKind,
    ref_id: i64,
    due_at: DateTime<Utc>,
) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let id = enqueue_outbox_tx(&mut tx, kind, ref_id, due_at).await?;
    tx.commit().await?;
    Ok(id)
}

async fn enqueue_outbox_tx(
    tx: &mut Transaction<'_, Sqlite>,
    kind: OutboxKind,
    ref_id: i64,
    due_at: DateTime<Utc>,
) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO outbox (kind, ref_id, attempt, due_at) VALUES (?, ?, 0, ?) RETURNING id",
    )
    .bind(kind.as_str())
    .bind(ref_id)
    .bind(due_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(rec.get("id"))
}

#[instrument(skip_all)]
pub async fn next_due_outbox(pool: &Pool) -> Result<Option<(i64, String, i64, i32)>> {
    let row = sqlx::query(
        "SELECT id, kind, ref_id, attempt FROM outbox WHERE datetime(due_at) <= CURRENT_TIMESTAMP ORDER BY datetime(due_at) ASC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|row| {
        (
            row.get("id"),
            row.get("kind"),
            row.get("ref_id"),
            row.get("attempt"),
        )
    }))
}

#[instrument(skip_all)]
pub async fn delete_outbox(pool: &Pool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM outbox WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn backoff_outbox_with_cap(
    pool: &Pool,
    id: i64,
    attempt: i32,
    max_cap_secs: i64,
) -> Result<()> {
    // Exponential backoff: 5s * 2^attempt, capped.
    let secs = (5_i64) * (1_i64 << attempt.min(10));
    let cap = if max_cap_secs <= 0 {
        secs
    } else {
        max_cap_secs
    };
    let secs = secs.min(cap);
    sqlx::query(
        "UPDATE outbox SET attempt = ?, due_at = datetime('now', ? || ' seconds') WHERE id = ?",
    )
    .bind(attempt + 1)
    .bind(secs)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
