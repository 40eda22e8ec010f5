//! Content-management backend for the Optica eyewear shop's marketing site.
//!
//! The crate owns the content data layer (blog posts, promo banners,
//! testimonials, FAQ, gallery, mirrored Instagram feed, contact messages),
//! the admin action surface on top of it, the markdown↔HTML converter used
//! for blog content, and the carousel autoplay controller. Hosting concerns
//! (routing, auth, object storage, the email provider, the Instagram Graph
//! API) are external collaborators consumed over simple request/response
//! contracts.

pub mod actions;
pub mod carousel;
pub mod config;
pub mod db;
pub mod instagram;
pub mod mailer;
pub mod markup;
pub mod model;
pub mod outbox;
