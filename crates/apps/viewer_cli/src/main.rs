use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use client::{ClientConfig, Geocoder, ViewerClient};
use foundation::math::lon_lat_to_web_mercator;
use foundation::{Extent, Id};
use protocol::Pagination;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use viewer::{ApplyOutcome, TagFilter, ViewerSession};

#[derive(Parser, Debug)]
#[command(author, version, about = "Command-line client for a SafeHaven map")]
struct Cli {
    /// API base URL (default: SAFEHAVEN_API_URL or http://127.0.0.1:28669)
    #[arg(long)]
    api_url: Option<String>,

    /// Request timeout in milliseconds (default: SAFEHAVEN_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Access {
    /// Access token to bootstrap with
    #[arg(long)]
    token: String,

    /// Family to activate instead of the first one
    #[arg(long)]
    family: Option<String>,

    /// Tag ids entities must carry
    #[arg(long = "require-tag")]
    require_tags: Vec<String>,

    /// Tag ids entities must not carry
    #[arg(long = "hide-tag")]
    hide_tags: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show server status
    Status,

    /// List entities and clusters inside a lon/lat box
    View {
        #[command(flatten)]
        access: Access,

        /// Bounding box: minLon,minLat,maxLon,maxLat (default: whole world)
        #[arg(long)]
        bbox: Option<String>,

        /// Zoom level (default: the configured start zoom)
        #[arg(long)]
        zoom: Option<f64>,
    },

    /// Full-text search in the active family
    Search {
        #[command(flatten)]
        access: Access,

        query: String,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },

    /// Show one entity with its comments and relations
    Entity {
        #[command(flatten)]
        access: Access,

        id: String,
    },

    /// Look up an address with Nominatim
    Geocode {
        query: String,

        #[arg(long, default_value_t = 5)]
        take: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.base_url = url;
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }

    match cli.command {
        Command::Status => {
            let session = ViewerSession::init(viewer_client(&config)?).await?;
            let status = session.status().ok_or("no status")?;
            println!("{} [{}]", status.general.title, status.status);
            if let Some(subtitle) = session.subtitle() {
                println!("{subtitle}");
            }
            println!(
                "safe mode: {}",
                if session.has_safe_mode() { "on" } else { "off" }
            );
        }
        Command::View { access, bbox, zoom } => {
            let mut session = open(&config, &access).await?;
            let extent = match bbox {
                Some(raw) => parse_bbox(&raw)?,
                None => parse_bbox("-180,-85,180,85")?,
            };
            let zoom = match zoom {
                Some(z) => z,
                None => f64::from(session.start_zoom()?),
            };
            if let ApplyOutcome::Applied(stats) = session.refresh_view(extent, zoom).await? {
                info!(?stats, "view refreshed");
            }
            for entity in session.entities() {
                println!(
                    "{}\t{}\t{}\t{:.1},{:.1}",
                    entity.entity_id,
                    entity.display_name,
                    entity.category.title,
                    entity.coordinates[0],
                    entity.coordinates[1]
                );
            }
            for cluster in session.clusters() {
                println!(
                    "cluster {}\t{} entities\t{:.1},{:.1}",
                    cluster.id, cluster.count, cluster.coordinates[0], cluster.coordinates[1]
                );
            }
        }
        Command::Search {
            access,
            query,
            page,
            page_size,
        } => {
            let session = open(&config, &access).await?;
            let results = session
                .search(&query, Pagination { page, page_size }, false)
                .await?;
            println!(
                "page {}/{} ({} results)",
                results.response_current_page, results.total_pages, results.total_results
            );
            for hit in &results.entities {
                println!(
                    "{}\t{}\t{}",
                    hit.entity.entity_id, hit.entity.display_name, hit.category.title
                );
            }
        }
        Command::Entity { access, id } => {
            let mut session = open(&config, &access).await?;
            let resolved = session.select_entity(&Id::from(id)).await?;
            let entity = &resolved.fetched.entity;
            println!("{} ({} / {})", entity.display_name, resolved.family.title, resolved.category.title);
            let tags: Vec<&str> = resolved.tags.values().map(|t| t.title.as_str()).collect();
            if !tags.is_empty() {
                println!("tags: {}", tags.join(", "));
            }
            for location in &entity.locations {
                println!("at {} ({}, {})", location.plain_text, location.lat, location.long);
            }
            for parent in &resolved.fetched.parents {
                println!("parent: {}", parent.display_name);
            }
            for child in &resolved.fetched.children {
                println!("child: {}", child.display_name);
            }
            for comment in &resolved.fetched.comments {
                println!("- {}: {}", comment.author, comment.text);
            }
        }
        Command::Geocode { query, take } => {
            let geocoder = Geocoder::new(&config)?;
            for result in geocoder.free_form_search(&query, take).await? {
                println!(
                    "{}\t{}\t{:.5},{:.5}",
                    result.title, result.subtitle, result.lat, result.lon
                );
            }
        }
    }

    Ok(())
}

fn viewer_client(config: &ClientConfig) -> Result<ViewerClient, client::ClientError> {
    Ok(ViewerClient::new(config)?.with_auth_failure(|| {
        warn!("access token rejected; bootstrap again");
    }))
}

async fn open(
    config: &ClientConfig,
    access: &Access,
) -> Result<ViewerSession<ViewerClient>, Box<dyn std::error::Error>> {
    let mut session = ViewerSession::init(viewer_client(config)?).await?;
    session.bootstrap_with_token(&access.token, None).await?;

    if let Some(family) = &access.family {
        session.set_active_family(&Id::from(family.as_str()))?;
    }
    session.update_filters(|filters| {
        for tag in &access.require_tags {
            if !filters.set_tag_filter(&Id::from(tag.as_str()), TagFilter::Required) {
                warn!(tag, "not a filterable tag");
            }
        }
        for tag in &access.hide_tags {
            if !filters.set_tag_filter(&Id::from(tag.as_str()), TagFilter::Hidden) {
                warn!(tag, "not a filterable tag");
            }
        }
    })?;
    Ok(session)
}

/// `minLon,minLat,maxLon,maxLat` in degrees, projected to Web Mercator.
fn parse_bbox(raw: &str) -> Result<Extent, Box<dyn std::error::Error>> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()?;
    let &[min_lon, min_lat, max_lon, max_lat] = parts.as_slice() else {
        return Err(format!("bbox needs 4 comma-separated values, got {}", parts.len()).into());
    };
    let [xmin, ymin] = lon_lat_to_web_mercator(min_lon, min_lat);
    let [xmax, ymax] = lon_lat_to_web_mercator(max_lon, max_lat);
    let extent = Extent::new(xmin, ymin, xmax, ymax);
    if !extent.is_valid() {
        return Err(format!("invalid bbox {raw}").into());
    }
    Ok(extent)
}
