use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use smartcommute::advisor::{CommuteAdvisor, RouteResolution, TomorrowBriefing};
use smartcommute::optimizer::{Recommendation, RiskGrid};
use smartcommute::predictor::loader;
use smartcommute::routing::{OsmRouteProvider, RouteProvider};
use smartcommute::weather::{OpenMeteoWeather, WeatherProvider};
use smartcommute::{
    ClockTime, CommuteConfig, CommuteDay, DepartureQuery, DistanceScale, Location,
    QuantileLevel, QuantilePredictor, SearchWindow, WeatherCategory, build_risk_grid, cache,
    find_optimal_departure, logging, web,
};

#[derive(Parser, Debug)]
#[command(name = "smartcommute")]
#[command(about = "Commute travel-time prediction and departure planning")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "SMARTCOMMUTE_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging for this crate
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Latest departure that arrives on time at the chosen confidence
    Depart {
        #[arg(long)]
        target: ClockTime,
        #[arg(long)]
        day: CommuteDay,
        #[arg(long, default_value = "Clear")]
        weather: WeatherCategory,
        /// One of 0.5, 0.75, 0.9, 0.95 (defaults to the configured level)
        #[arg(long)]
        confidence: Option<f64>,
        #[arg(long)]
        start: Option<ClockTime>,
        #[arg(long)]
        end: Option<ClockTime>,
        #[arg(long)]
        step: Option<u32>,
        #[arg(long, default_value_t = 1.0)]
        distance_scale: f64,
        /// Print every evaluated candidate
        #[arg(long)]
        trace: bool,
    },
    /// Late-arrival risk by departure slot and weather
    Risk {
        #[arg(long)]
        target: ClockTime,
        #[arg(long, default_value_t = 1.0)]
        distance_scale: f64,
    },
    /// Tomorrow's commute from the destination's forecast
    Tomorrow {
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
    },
    /// Resolve a driving route and its distance scale
    Route {
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
    },
    /// Daily forecast for a coordinate
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Defaults to the configured forecast length
        #[arg(long)]
        days: Option<u8>,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CommuteConfig::load_from_path(cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    logging::init_tracing(&config.logging, cli.verbose);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_predictor(config: &CommuteConfig) -> Result<Arc<QuantilePredictor>> {
    let predictor = loader::load(&config.model.dir)
        .with_context(|| format!("Failed to load models from {}", config.model.dir))?;
    Ok(Arc::new(predictor))
}

fn init_cache(config: &CommuteConfig) {
    if !config.cache.enabled {
        return;
    }
    match cache::init(&config.cache.location) {
        Ok(()) => info!(location = %config.cache.location, "response cache ready"),
        Err(e) => warn!("Response cache unavailable, continuing without it: {e:#}"),
    }
}

fn build_advisor(config: &CommuteConfig, predictor: Arc<QuantilePredictor>) -> Result<CommuteAdvisor> {
    let routes: Arc<dyn RouteProvider> =
        Arc::new(OsmRouteProvider::new(&config.services, &config.cache)?);
    let weather: Arc<dyn WeatherProvider> =
        Arc::new(OpenMeteoWeather::new(&config.services, &config.cache)?);
    Ok(CommuteAdvisor::new(
        predictor,
        routes,
        weather,
        config.route.clone(),
        config.search.clone(),
    ))
}

async fn run(command: Command, config: CommuteConfig) -> Result<()> {
    match command {
        Command::Depart {
            target,
            day,
            weather,
            confidence,
            start,
            end,
            step,
            distance_scale,
            trace,
        } => {
            let predictor = load_predictor(&config)?;
            let confidence = match confidence {
                Some(value) => QuantileLevel::try_from(value)?,
                None => config.search.confidence,
            };
            let window = SearchWindow::new(
                start.unwrap_or(config.search.start),
                end.unwrap_or(config.search.end),
                step.unwrap_or(config.search.step_minutes),
            )?;
            let query = DepartureQuery::new(target, day, weather, confidence)
                .with_window(window)
                .with_distance_scale(DistanceScale::new(distance_scale)?);
            let recommendation = find_optimal_departure(&predictor, &query)?;
            print_recommendation(&recommendation, trace);
        }
        Command::Risk {
            target,
            distance_scale,
        } => {
            let predictor = load_predictor(&config)?;
            let grid = build_risk_grid(&predictor, target, DistanceScale::new(distance_scale)?)?;
            print_risk_grid(&grid);
        }
        Command::Tomorrow {
            origin,
            destination,
        } => {
            let predictor = load_predictor(&config)?;
            init_cache(&config);
            let advisor = build_advisor(&config, predictor)?;
            let (route, briefing) = advisor.tomorrow(&origin, &destination).await?;
            print_route(&route);
            match briefing {
                Some(briefing) => print_briefing(&briefing),
                None => println!("No weekday commute tomorrow (or no forecast available)."),
            }
        }
        Command::Route {
            origin,
            destination,
        } => {
            init_cache(&config);
            let routes = OsmRouteProvider::new(&config.services, &config.cache)?;
            let info = routes.driving_info(&origin, &destination).await;
            print_route(&RouteResolution::from_route_info(&origin, info, &config.route));
        }
        Command::Forecast { lat, lon, days } => {
            init_cache(&config);
            let weather = OpenMeteoWeather::new(&config.services, &config.cache)?;
            let location = Location::at(lat, lon);
            let days = days.unwrap_or(config.services.forecast_days);
            let forecasts = weather.daily_forecast(&location, days).await;
            if forecasts.is_empty() {
                println!("No forecast available.");
            }
            for forecast in forecasts {
                println!(
                    "{:<10} {}  {:<28} precip {:>3}%  {}  -> {}",
                    forecast.day_name,
                    forecast.date,
                    forecast.weather_description,
                    forecast.precipitation_probability,
                    forecast.format_temperature(),
                    forecast.weather_category
                );
            }
        }
        Command::Serve { port } => {
            let predictor = load_predictor(&config)?;
            init_cache(&config);
            let advisor = build_advisor(&config, predictor)?;
            let port = port.unwrap_or(config.server.port);
            web::run(advisor, &config.server.host, port).await?;
        }
    }
    Ok(())
}

fn print_recommendation(recommendation: &Recommendation, trace: bool) {
    println!(
        "Target {} on {} in {} weather at {:.0}% confidence",
        recommendation.target_arrival,
        recommendation.day,
        recommendation.weather,
        f64::from(recommendation.confidence_level.percent())
    );
    match (
        recommendation.recommended_departure,
        recommendation.predicted_travel_min,
        recommendation.predicted_arrival,
        recommendation.buffer_minutes,
    ) {
        (Some(departure), Some(travel), Some(arrival), Some(buffer)) => {
            println!(
                "Leave at {departure}: ~{travel:.1} min travel, arrive {arrival}, {buffer:.1} min buffer"
            );
        }
        _ => println!("Not achievable: no departure in the search window arrives on time."),
    }

    if trace {
        println!("\n{:>9} {:>10} {:>9} {:>8}  on time", "departure", "travel", "arrival", "buffer");
        for c in &recommendation.all_candidates {
            println!(
                "{:>9} {:>10.1} {:>9} {:>8.1}  {}",
                c.departure.to_string(),
                c.predicted_travel_min,
                c.predicted_arrival.to_string(),
                c.buffer_min,
                if c.on_time { "yes" } else { "no" }
            );
        }
    }
}

fn print_risk_grid(grid: &RiskGrid) {
    println!("P(late) for arrival by {}", grid.target_arrival);
    print!("{:>9}", "departure");
    for weather in WeatherCategory::ALL {
        print!(" {:>10}", weather.name());
    }
    println!();

    let columns: Vec<Vec<f64>> = WeatherCategory::ALL
        .iter()
        .map(|weather| grid.for_weather(*weather).map(|c| c.late_probability).collect())
        .collect();
    for (row, cell) in grid.for_weather(WeatherCategory::Clear).enumerate() {
        print!("{:>9}", cell.departure.to_string());
        for column in &columns {
            let probability = column.get(row).copied().unwrap_or(f64::NAN);
            print!(" {:>9.0}%", probability * 100.0);
        }
        println!();
    }
}

fn print_route(route: &RouteResolution) {
    if route.live {
        println!(
            "{}: {:.1} mi, base {:.0} min (scale {})",
            route.label(),
            route.distance_mi,
            route.duration_min,
            route.distance_scale
        );
    } else {
        println!(
            "Route lookup failed ({}); using the reference route: {:.0} mi, {:.0} min to {}",
            route.error.as_deref().unwrap_or("unknown error"),
            route.distance_mi,
            route.duration_min,
            route.destination.short_name()
        );
    }
}

fn print_briefing(briefing: &TomorrowBriefing) {
    let forecast = &briefing.forecast;
    println!(
        "\n{} {}: {} ({}), precip {}%, {}",
        forecast.day_name,
        forecast.date,
        forecast.weather_description,
        forecast.weather_category,
        forecast.precipitation_probability,
        forecast.format_temperature()
    );
    for (label, recommendation) in [
        ("08:00", &briefing.arrive_by_eight),
        ("09:00", &briefing.arrive_by_nine),
    ] {
        match (recommendation.recommended_departure, recommendation.buffer_minutes) {
            (Some(departure), Some(buffer)) => println!(
                "Arrive by {label} (95% confidence): leave at {departure}, {buffer:.0} min buffer"
            ),
            _ => println!("Arrive by {label}: may not be feasible with 95% confidence"),
        }
    }
    if let Some(delta) = briefing.weather_impact_minutes {
        println!(
            "{} means leaving {delta:.0} minutes earlier than on a clear day to arrive by 08:00.",
            forecast.weather_category
        );
    }
}
