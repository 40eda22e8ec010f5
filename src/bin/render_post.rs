use anyhow::{anyhow, Context, Result};
use clap::Parser;
use optica_cms::{config, db, markup};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Render a blog post's content to a display-styled HTML fragment for preview.")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Slug of the post to render
    #[arg(long)]
    slug: String,

    /// Output file (defaults to <slug>.html in the data dir)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/optica.db", cfg.app.data_dir));
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let post = db::get_post_by_slug(&pool, &args.slug)
        .await?
        .ok_or_else(|| anyhow!("no post with slug '{}'", args.slug))?;

    let html = markup::render_for_display(&post.content);
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(&cfg.app.data_dir).join(format!("{}.html", post.slug)));
    tokio::fs::write(&out, &html)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;

    println!("wrote {} ({} bytes)", out.display(), html.len());
    Ok(())
}
