#![forbid(unsafe_code)]
use anyhow::Result;
use clap::{Parser, Subcommand};
use geo_permalink::{
    Crs, PermalinkEncoder, ThemeToken, ViewState, config::ServerConfig, decode, dms,
    external::ExternalLinks, server::run_server, transform::Proj4Transformer,
};

/// Map permalinks: encode views, decode links, and serve them locally.
#[derive(Parser)]
#[command(name = "geo-permalink", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the permalink server (configured through PERMALINK_* variables)
    Serve,
    /// Decode a permalink, Google Maps link or coordinate text
    Decode {
        url: String,
    },
    /// Build a permalink for a view
    Encode {
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[arg(long)]
        scale: f64,
        #[arg(long, default_value = "EPSG:3857")]
        crs: String,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        rotation: f64,
        /// Theme name, or a layer-state JSON object
        #[arg(long)]
        theme: Option<String>,
        #[arg(long, default_value = geo_permalink::encode::DEFAULT_BASE_URL)]
        base_url: String,
    },
}

fn print_decoded(input: &str) -> Result<()> {
    let decoded = decode(input)?;
    let view = &decoded.view;
    println!("shape:    {}", decoded.shape);
    println!("x:        {}", view.x);
    println!("y:        {}", view.y);
    println!("crs:      {}", view.crs);
    println!("scale:    {}", view.scale);
    println!("zoom:     {}", decoded.zoom);
    println!("rotation: {}", view.rotation);
    if let Some(theme) = &view.theme {
        println!("theme:    {}", theme.to_param());
    }
    match view.lat_lon(&Proj4Transformer) {
        Ok((lat, lon)) => println!("position: {}", dms::format_position(lat, lon)),
        Err(e) => println!("position: unavailable ({e})"),
    }
    if let Ok(links) = ExternalLinks::new(view, &Proj4Transformer) {
        println!("google maps:  {}", links.google_maps);
        println!("google earth: {}", links.google_earth);
    }
    println!("permalink: {}", PermalinkEncoder::default().encode(view));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(ServerConfig::from_env()).await,
        Command::Decode { url } => print_decoded(&url),
        Command::Encode {
            x,
            y,
            scale,
            crs,
            rotation,
            theme,
            base_url,
        } => {
            let theme = match theme {
                Some(theme) => ThemeToken::parse(&theme)?,
                None => None,
            };
            let view = ViewState::new(x, y, Crs::parse(&crs)?, scale)
                .with_rotation(rotation)
                .with_theme(theme)
                .validate()?;
            let encoder = PermalinkEncoder::new(&base_url, geo_permalink::encode::DEFAULT_ENDPOINT);
            println!("{}", encoder.encode(&view));
            Ok(())
        }
    }
}
